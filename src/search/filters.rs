//! Structured search filters
//!
//! A request carries filters as `{role, value}` pairs with role-typed JSON
//! values. They are decoded once, at the edge, into the closed [`Filter`]
//! sum type and collected into a [`FilterSet`] keyed by role:
//! - price → `{min, max}` (integers, minor currency units)
//! - color / dropdown → array of strings
//! - checkbox → boolean
//! - height / width / depth / weight / area / volume → `{min, max, dimension}`
//!
//! A value that does not fit its role is rejected, naming the role. Unknown
//! roles follow [`UnknownFilterPolicy`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::UnknownFilterPolicy;
use crate::error::{BazaarError, Result};

/// Every filter role this build understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterRole {
    Price,
    Color,
    Dropdown,
    Checkbox,
    Height,
    Width,
    Depth,
    Weight,
    Area,
    Volume,
}

impl FilterRole {
    pub const ALL: [Self; 10] = [
        Self::Price,
        Self::Color,
        Self::Dropdown,
        Self::Checkbox,
        Self::Height,
        Self::Width,
        Self::Depth,
        Self::Weight,
        Self::Area,
        Self::Volume,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Color => "color",
            Self::Dropdown => "dropdown",
            Self::Checkbox => "checkbox",
            Self::Height => "height",
            Self::Width => "width",
            Self::Depth => "depth",
            Self::Weight => "weight",
            Self::Area => "area",
            Self::Volume => "volume",
        }
    }

    /// Parse a role name, ignoring ASCII case and surrounding blanks.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(name))
    }

    /// Dimension role carried by this role, if any.
    #[must_use]
    pub const fn dimension(self) -> Option<DimensionRole> {
        match self {
            Self::Height => Some(DimensionRole::Height),
            Self::Width => Some(DimensionRole::Width),
            Self::Depth => Some(DimensionRole::Depth),
            Self::Weight => Some(DimensionRole::Weight),
            Self::Area => Some(DimensionRole::Area),
            Self::Volume => Some(DimensionRole::Volume),
            Self::Price | Self::Color | Self::Dropdown | Self::Checkbox => None,
        }
    }
}

impl fmt::Display for FilterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles whose value is a measured quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionRole {
    Height,
    Width,
    Depth,
    Weight,
    Area,
    Volume,
}

impl DimensionRole {
    #[must_use]
    pub const fn role(self) -> FilterRole {
        match self {
            Self::Height => FilterRole::Height,
            Self::Width => FilterRole::Width,
            Self::Depth => FilterRole::Depth,
            Self::Weight => FilterRole::Weight,
            Self::Area => FilterRole::Area,
            Self::Volume => FilterRole::Volume,
        }
    }

    #[must_use]
    pub const fn family(self) -> UnitFamily {
        match self {
            Self::Height | Self::Width | Self::Depth => UnitFamily::Length,
            Self::Weight => UnitFamily::Mass,
            Self::Area => UnitFamily::Area,
            Self::Volume => UnitFamily::Volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFamily {
    Length,
    Mass,
    Area,
    Volume,
}

/// Measurement unit of a dimension filter.
///
/// Characteristics are stored in each family's base unit (mm, g, cm2, ml).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Mm,
    Cm,
    M,
    G,
    Kg,
    Cm2,
    M2,
    Ml,
    L,
}

impl Unit {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mm" => Some(Self::Mm),
            "cm" => Some(Self::Cm),
            "m" => Some(Self::M),
            "g" => Some(Self::G),
            "kg" => Some(Self::Kg),
            "cm2" | "cm²" => Some(Self::Cm2),
            "m2" | "m²" => Some(Self::M2),
            "ml" => Some(Self::Ml),
            "l" => Some(Self::L),
            _ => None,
        }
    }

    #[must_use]
    pub const fn family(self) -> UnitFamily {
        match self {
            Self::Mm | Self::Cm | Self::M => UnitFamily::Length,
            Self::G | Self::Kg => UnitFamily::Mass,
            Self::Cm2 | Self::M2 => UnitFamily::Area,
            Self::Ml | Self::L => UnitFamily::Volume,
        }
    }

    /// Multiplier into the family's base unit.
    #[must_use]
    pub const fn base_factor(self) -> f64 {
        match self {
            Self::Mm | Self::G | Self::Cm2 | Self::Ml => 1.0,
            Self::Cm => 10.0,
            Self::M | Self::Kg | Self::L => 1000.0,
            Self::M2 => 10_000.0,
        }
    }
}

/// Inclusive price bounds in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriceRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

/// Inclusive dimension bounds in `unit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DimensionRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(rename = "dimension")]
    pub unit: Unit,
}

impl DimensionRange {
    /// Bounds converted to the base unit.
    #[must_use]
    pub fn base_bounds(&self) -> (Option<f64>, Option<f64>) {
        let factor = self.unit.base_factor();
        (self.min.map(|v| v * factor), self.max.map(|v| v * factor))
    }
}

/// One decoded filter. The variant fixes the role's value shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Price(PriceRange),
    Color(Vec<String>),
    Dropdown(Vec<String>),
    Checkbox(bool),
    Dimension(DimensionRole, DimensionRange),
}

impl Filter {
    #[must_use]
    pub const fn role(&self) -> FilterRole {
        match self {
            Self::Price(_) => FilterRole::Price,
            Self::Color(_) => FilterRole::Color,
            Self::Dropdown(_) => FilterRole::Dropdown,
            Self::Checkbox(_) => FilterRole::Checkbox,
            Self::Dimension(dim, _) => dim.role(),
        }
    }

    /// Decode a role-typed JSON value.
    pub fn decode(role: FilterRole, value: &Value) -> Result<Self> {
        let shape_err = |reason: String| BazaarError::InvalidFilterShape {
            role: role.as_str().to_string(),
            reason,
        };

        let filter = match role {
            FilterRole::Price => {
                let range: PriceRange = serde_json::from_value(value.clone())
                    .map_err(|e| shape_err(format!("expected {{min, max}} integers: {e}")))?;
                check_bounds(range.min, range.max).map_err(shape_err)?;
                Self::Price(range)
            }
            FilterRole::Color => Self::Color(decode_string_set(value).map_err(shape_err)?),
            FilterRole::Dropdown => Self::Dropdown(decode_string_set(value).map_err(shape_err)?),
            FilterRole::Checkbox => match value {
                Value::Bool(flag) => Self::Checkbox(*flag),
                other => return Err(shape_err(format!("expected a boolean, got {other}"))),
            },
            FilterRole::Height
            | FilterRole::Width
            | FilterRole::Depth
            | FilterRole::Weight
            | FilterRole::Area
            | FilterRole::Volume => {
                let Some(dim) = role.dimension() else {
                    return Err(shape_err("not a dimension role".to_string()));
                };
                let unit_raw = value
                    .get("dimension")
                    .and_then(Value::as_str)
                    .ok_or_else(|| shape_err("expected {min, max, dimension}".to_string()))?;
                let unit = Unit::parse(unit_raw)
                    .ok_or_else(|| shape_err(format!("unknown unit '{unit_raw}'")))?;
                if unit.family() != dim.family() {
                    return Err(shape_err(format!("unit '{unit_raw}' does not measure {role}")));
                }
                let mut normalized = value.clone();
                if let Some(obj) = normalized.as_object_mut() {
                    obj.insert("dimension".to_string(), serde_json::to_value(unit)?);
                }
                let range: DimensionRange = serde_json::from_value(normalized)
                    .map_err(|e| shape_err(format!("expected {{min, max, dimension}}: {e}")))?;
                check_bounds(range.min, range.max).map_err(shape_err)?;
                Self::Dimension(dim, range)
            }
        };
        Ok(filter)
    }

    /// JSON value in request shape, inverse of [`Filter::decode`].
    pub fn value(&self) -> Result<Value> {
        let value = match self {
            Self::Price(range) => serde_json::to_value(range)?,
            Self::Color(values) | Self::Dropdown(values) => serde_json::to_value(values)?,
            Self::Checkbox(flag) => Value::Bool(*flag),
            Self::Dimension(_, range) => serde_json::to_value(range)?,
        };
        Ok(value)
    }
}

fn check_bounds<T: PartialOrd + Copy>(min: Option<T>, max: Option<T>) -> std::result::Result<(), String> {
    match (min, max) {
        (None, None) => Err("expected at least one of min, max".to_string()),
        (Some(lo), Some(hi)) if lo > hi => Err("min is greater than max".to_string()),
        _ => Ok(()),
    }
}

fn decode_string_set(value: &Value) -> std::result::Result<Vec<String>, String> {
    let Value::Array(items) = value else {
        return Err(format!("expected an array of strings, got {value}"));
    };
    if items.is_empty() {
        return Err("expected a non-empty array of strings".to_string());
    }
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Value::String(s) = item else {
            return Err(format!("expected an array of strings, found {item}"));
        };
        if !out.contains(s) {
            out.push(s.clone());
        }
    }
    Ok(out)
}

/// Filter exactly as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFilter {
    pub role: String,
    pub value: Value,
}

/// Decoded filters, at most one per role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<RawFilter>", try_from = "Vec<RawFilter>")]
pub struct FilterSet {
    filters: BTreeMap<FilterRole, Filter>,
}

impl FilterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode wire filters. A repeated role is a shape error for that role.
    pub fn decode(raw: &[RawFilter], policy: UnknownFilterPolicy) -> Result<Self> {
        let mut set = Self::new();
        for entry in raw {
            let Some(role) = FilterRole::parse(&entry.role) else {
                match policy {
                    UnknownFilterPolicy::Ignore => {
                        warn!(role = %entry.role, "ignoring filter with unknown role");
                        continue;
                    }
                    UnknownFilterPolicy::Reject => {
                        return Err(BazaarError::UnknownFilterRole(entry.role.clone()));
                    }
                }
            };
            if set.filters.contains_key(&role) {
                return Err(BazaarError::InvalidFilterShape {
                    role: role.as_str().to_string(),
                    reason: "role given more than once".to_string(),
                });
            }
            set.insert(Filter::decode(role, &entry.value)?);
        }
        Ok(set)
    }

    /// Insert or replace the filter for its role.
    pub fn insert(&mut self, filter: Filter) -> Option<Filter> {
        self.filters.insert(filter.role(), filter)
    }

    #[must_use]
    pub fn with(mut self, filter: Filter) -> Self {
        self.insert(filter);
        self
    }

    #[must_use]
    pub fn get(&self, role: FilterRole) -> Option<&Filter> {
        self.filters.get(&role)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Filters in role order.
    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.values()
    }

    /// Wire form, in role order.
    pub fn to_raw(&self) -> Result<Vec<RawFilter>> {
        self.iter()
            .map(|filter| {
                Ok(RawFilter {
                    role: filter.role().as_str().to_string(),
                    value: filter.value()?,
                })
            })
            .collect()
    }
}

impl From<FilterSet> for Vec<RawFilter> {
    fn from(set: FilterSet) -> Self {
        // every decoded value serializes; a failure would drop just that entry
        set.iter()
            .filter_map(|filter| {
                filter.value().ok().map(|value| RawFilter {
                    role: filter.role().as_str().to_string(),
                    value,
                })
            })
            .collect()
    }
}

impl TryFrom<Vec<RawFilter>> for FilterSet {
    type Error = BazaarError;

    fn try_from(raw: Vec<RawFilter>) -> Result<Self> {
        Self::decode(&raw, UnknownFilterPolicy::Reject)
    }
}
