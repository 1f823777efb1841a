//! Render a [`PhaseQuery`] into SQL text plus positional parameters.
//!
//! Parameters are pushed in the order their `?` appears in the text, so the
//! renderer walks the tree exactly once, left to right.

use itertools::Itertools;
use rusqlite::types::Value;

use super::ast::{Direction, Expr, PhaseQuery, Predicate, SortKey, Subquery};

/// Table alias of the scanned listing.
const ROW: &str = "l";
/// Table alias of the cursor's anchor listing.
const ANCHOR: &str = "a";

/// Parameterised SQL ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Default)]
struct Renderer {
    sql: String,
    params: Vec<Value>,
}

impl Renderer {
    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn bind(&mut self, value: Value) {
        self.sql.push('?');
        self.params.push(value);
    }

    fn expr(&mut self, expr: &Expr, alias: &str) {
        match expr {
            Expr::Column(column) => {
                self.push(alias);
                self.push(".");
                self.push(column.name());
            }
            Expr::Param(value) => self.bind(value.clone()),
            Expr::Const(number) => self.push(&format!("{number:?}")),
            Expr::Call(func, args) => {
                self.push(func.name());
                self.push("(");
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        self.push(", ");
                    }
                    self.expr(arg, alias);
                }
                self.push(")");
            }
            Expr::Weighted(terms) => {
                if terms.is_empty() {
                    self.push("0.0");
                    return;
                }
                self.push("(");
                for (idx, (weight, term)) in terms.iter().enumerate() {
                    if idx > 0 {
                        self.push(" + ");
                    }
                    self.push(&format!("{weight:?} * "));
                    self.expr(term, alias);
                }
                self.push(")");
            }
            Expr::Characteristic(path) => {
                self.push("(SELECT json_extract(ch.data, ");
                self.bind(Value::Text(path.clone()));
                self.push(") FROM listing_characteristics ch WHERE ch.listing_id = ");
                self.push(alias);
                self.push(".id)");
            }
        }
    }

    fn joined(&mut self, parts: &[Predicate], sep: &str, empty: &str) {
        if parts.is_empty() {
            self.push(empty);
            return;
        }
        self.push("(");
        for (idx, part) in parts.iter().enumerate() {
            if idx > 0 {
                self.push(sep);
            }
            self.predicate(part);
        }
        self.push(")");
    }

    fn predicate(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::Const(true) => self.push("1"),
            Predicate::Const(false) => self.push("0"),
            Predicate::And(parts) => self.joined(parts, " AND ", "1"),
            Predicate::Or(parts) => self.joined(parts, " OR ", "0"),
            Predicate::Not(inner) => {
                self.push("NOT ");
                // composite children already carry parentheses
                let wrap = !matches!(**inner, Predicate::And(_) | Predicate::Or(_));
                if wrap {
                    self.push("(");
                }
                self.predicate(inner);
                if wrap {
                    self.push(")");
                }
            }
            Predicate::Compare(lhs, op, rhs) => {
                self.expr(lhs, ROW);
                self.push(" ");
                self.push(op.symbol());
                self.push(" ");
                self.expr(rhs, ROW);
            }
            Predicate::IsNull(expr) => {
                self.expr(expr, ROW);
                self.push(" IS NULL");
            }
            Predicate::Truthy(expr) => self.expr(expr, ROW),
            Predicate::InList(expr, values) => {
                if values.is_empty() {
                    self.push("0");
                    return;
                }
                self.expr(expr, ROW);
                self.push(" IN (");
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        self.push(", ");
                    }
                    self.bind(value.clone());
                }
                self.push(")");
            }
            Predicate::IdIn(subquery) => self.subquery(subquery),
            Predicate::Keyset {
                keys,
                op,
                anchor_id,
            } => {
                self.key_tuple(keys, ROW);
                self.push(" ");
                self.push(op.symbol());
                self.push(" (SELECT ");
                for (idx, key) in keys.iter().enumerate() {
                    if idx > 0 {
                        self.push(", ");
                    }
                    self.expr(key, ANCHOR);
                }
                self.push(" FROM listings ");
                self.push(ANCHOR);
                self.push(" WHERE ");
                self.push(ANCHOR);
                self.push(".id = ");
                self.bind(Value::Text(anchor_id.clone()));
                self.push(")");
            }
        }
    }

    fn key_tuple(&mut self, keys: &[Expr], alias: &str) {
        self.push("(");
        for (idx, key) in keys.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.expr(key, alias);
        }
        self.push(")");
    }

    fn subquery(&mut self, subquery: &Subquery) {
        self.push(ROW);
        self.push(".id IN (");
        match subquery {
            Subquery::CategorySubtree(category) => {
                self.push(
                    "SELECT lc.listing_id FROM listing_categories lc WHERE lc.category_id IN \
                     (WITH RECURSIVE subtree(id) AS (SELECT id FROM categories WHERE id = ",
                );
                self.bind(Value::Text(category.clone()));
                self.push(" OR name = ");
                self.bind(Value::Text(category.clone()));
                self.push(
                    " UNION SELECT c.id FROM categories c JOIN subtree s ON c.parent_id = s.id) \
                     SELECT id FROM subtree)",
                );
            }
            Subquery::GeoRadius {
                latitude,
                longitude,
                radius_km,
            } => {
                self.push(
                    "SELECT loc.listing_id FROM listing_locations loc \
                     WHERE geo_distance_km(loc.latitude, loc.longitude, ",
                );
                self.bind(Value::Real(*latitude));
                self.push(", ");
                self.bind(Value::Real(*longitude));
                self.push(") <= ");
                self.bind(Value::Real(*radius_km));
            }
        }
        self.push(")");
    }

    fn order_by(&mut self, keys: &[SortKey], direction: Direction, inner: bool) {
        let clause = keys
            .iter()
            .map(|key| {
                let column = match key {
                    SortKey::Rank => "rank".to_string(),
                    other if inner => format!("{ROW}.{}", other.output_name()),
                    other => other.output_name().to_string(),
                };
                format!("{column} {}", direction.keyword())
            })
            .join(", ");
        self.push(" ORDER BY ");
        self.push(&clause);
    }
}

/// Render a phase query.
///
/// A backward query orders the scan in reverse, takes `limit` rows, then
/// flips them back into natural order in an outer select.
#[must_use]
pub fn render(query: &PhaseQuery) -> RenderedQuery {
    let mut r = Renderer::default();
    if query.backward {
        r.push("SELECT * FROM (");
    }
    r.push(
        "SELECT l.id AS id, l.title AS title, l.description AS description, \
         l.price AS price, l.currency AS currency, l.created_at AS created_at, \
         l.updated_at AS updated_at, ",
    );
    r.expr(&query.rank, ROW);
    r.push(" AS rank FROM listings l WHERE ");
    r.predicate(&query.filter);

    let scan_direction = if query.backward {
        query.direction.reversed()
    } else {
        query.direction
    };
    r.order_by(&query.order, scan_direction, true);
    r.push(" LIMIT ");
    r.bind(Value::Integer(i64::from(query.limit)));

    if query.backward {
        r.push(")");
        r.order_by(&query.order, query.direction, false);
    }

    RenderedQuery {
        sql: r.sql,
        params: r.params,
    }
}

/// Render a bare predicate. Used by diagnostics and tests.
#[must_use]
pub fn render_predicate(predicate: &Predicate) -> RenderedQuery {
    let mut r = Renderer::default();
    r.predicate(predicate);
    RenderedQuery {
        sql: r.sql,
        params: r.params,
    }
}
