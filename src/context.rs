use crate::Result;
use crate::error::ConfigError;
use indexmap::IndexMap;
use serde::Deserialize;

/// Which backend a product runs against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunMode {
    /// Shared local backend stack
    #[default]
    Local,
    /// Shared development environment
    Dev,
    /// Production backend (read-only workflows)
    Prod,
}

/// Per-invocation run state. Consumed read-only by the conflict engine
/// except for `options`, which reassigned ports are written into.
#[derive(Debug, Default)]
pub struct RunContext {
    pub mode: RunMode,
    /// Forced-kill mode: always terminate conflicting listeners, no
    /// per-conflict choice.
    pub kill: bool,
    /// Blanket auto-confirm: answer every yes/no prompt affirmatively.
    pub yes: bool,
    /// Negotiate but do not kill processes or run commands.
    pub dry_run: bool,
    pub options: IndexMap<String, String>,
}

impl RunContext {
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }
}

/// Parse `-o key=value` overrides into an ordered option map.
pub fn parse_option_overrides(args: &[String]) -> Result<IndexMap<String, String>> {
    let mut options = IndexMap::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            return Err(ConfigError::InvalidOptionFlag { arg: arg.clone() }.into());
        };
        if key.is_empty() {
            return Err(ConfigError::InvalidOptionFlag { arg: arg.clone() }.into());
        }
        options.insert(key.to_string(), value.to_string());
    }
    Ok(options)
}
