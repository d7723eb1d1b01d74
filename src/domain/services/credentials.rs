//! Credential Parser
//!
//! Decodes the flat `KEY=VALUE` document stored in a database admin secret.

use crate::domain::error::GatewayError;
use std::collections::HashMap;

/// Flat key/value credentials document.
///
/// Only the default section is read: keys that follow a `[section]` header
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    values: HashMap<String, String>,
}

impl Credentials {
    /// Parse a credentials document.
    ///
    /// Accepts `key = value` and `key: value`, skips blank lines and `#`/`;`
    /// comments, strips one pair of surrounding quotes from values.
    pub fn parse(raw: &[u8]) -> Result<Self, GatewayError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| GatewayError::Upstream(format!("credentials are not utf-8: {}", e)))?;

        let mut values = HashMap::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') {
                break;
            }

            let Some(sep) = line.find(['=', ':']) else {
                return Err(GatewayError::Upstream(format!(
                    "malformed credentials line {}",
                    idx + 1
                )));
            };
            let key = line[..sep].trim();
            let value = unquote(line[sep + 1..].trim());
            values.insert(key.to_string(), value.to_string());
        }

        Ok(Self { values })
    }

    /// Value for `key`, or `None` when absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
