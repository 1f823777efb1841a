//! bazaar config - Show effective configuration

use clap::Args;

use crate::app::AppContext;
use crate::cli::output;
use crate::config::Config;
use crate::error::{BazaarError, Result};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Dotted key to print (e.g. `search.max_limit`); all when omitted
    pub key: Option<String>,
}

pub fn run(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    let Some(key) = args.key.as_deref() else {
        return emit_config(ctx);
    };
    let value = config_value_at(&ctx.config, key)?;
    if ctx.json {
        return output::emit_json(&value);
    }
    println!("{}", format_value(&value));
    Ok(())
}

fn emit_config(ctx: &AppContext) -> Result<()> {
    if ctx.json {
        return output::emit_json(&ctx.config);
    }
    let rendered = toml::to_string_pretty(&ctx.config)
        .map_err(|err| BazaarError::Config(format!("render config: {err}")))?;
    println!("{rendered}");
    Ok(())
}

fn config_value_at(config: &Config, key: &str) -> Result<serde_json::Value> {
    let root = serde_json::to_value(config)?;
    key.split('.')
        .try_fold(&root, |node, part| node.get(part))
        .cloned()
        .ok_or_else(|| BazaarError::Config(format!("unknown config key: {key}")))
}

fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
