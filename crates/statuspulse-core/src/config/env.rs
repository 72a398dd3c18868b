//! `env:NAME` indirection in configuration values.

use crate::error::ConfigError;
use serde_json::Value;

/// Prefix marking a string value as an environment variable reference.
pub const ENV_PREFIX: &str = "env:";

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Replace every `env:NAME` string in `value` with the variable's value.
///
/// `lookup` resolves a variable name; the process environment is
/// [`get_var`]. The first unresolvable reference is reported together with
/// its dotted path in the document.
pub fn resolve_env_refs<F>(value: &mut Value, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    resolve_at(value, lookup, &mut String::new())
}

fn resolve_at<F>(value: &mut Value, lookup: &F, path: &mut String) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => {
            if let Some(name) = s.strip_prefix(ENV_PREFIX) {
                let name = name.trim();
                match lookup(name) {
                    Some(resolved) => *s = resolved,
                    None => {
                        return Err(ConfigError::UnresolvedEnv {
                            name: name.to_string(),
                            path: path.clone(),
                        })
                    }
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{}]", i));
                resolve_at(item, lookup, path)?;
                path.truncate(len);
            }
        }
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                let len = path.len();
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(key);
                resolve_at(item, lookup, path)?;
                path.truncate(len);
            }
        }
        _ => {}
    }
    Ok(())
}
