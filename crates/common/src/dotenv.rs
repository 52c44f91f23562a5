//! Minimal `.env` reader used to supply service document addresses.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Variables read from one dotenv file, in file order.
#[derive(Debug, Clone, Default)]
pub struct DotenvFile {
    path: PathBuf,
    vars: Vec<(String, String)>,
}

impl DotenvFile {
    /// Read a dotenv file. A missing file yields an empty set of variables.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                vars: Vec::new(),
            });
        }

        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Dotenv {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Self::parse(path, &contents)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut vars = Vec::new();

        for (index, line) in contents.lines().enumerate() {
            let parsed = parse_line(line).map_err(|reason| ConfigError::Dotenv {
                path: path.to_path_buf(),
                reason: format!("line {}: {reason}", index + 1),
            })?;

            if let Some((key, value)) = parsed {
                if !seen.insert(key.clone()) {
                    return Err(ConfigError::Dotenv {
                        path: path.to_path_buf(),
                        reason: format!("duplicate variable '{key}'"),
                    });
                }
                vars.push((key, value));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            vars,
        })
    }

    /// File the variables came from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of `key`, if the file sets it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// All variables as a map.
    pub fn get_vars(&self) -> HashMap<String, String> {
        self.vars.iter().cloned().collect()
    }
}

/// Parse one line into `Some((key, value))`, or `None` for blanks and comments.
fn parse_line(line: &str) -> Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let body = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, raw_value) = body
        .split_once('=')
        .ok_or_else(|| "missing '='".to_string())?;

    let key = key.trim();
    if !is_valid_key(key) {
        return Err(format!("invalid variable name '{key}'"));
    }

    let raw_value = raw_value.trim();
    let value = match raw_value.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            if raw_value.len() < 2 || !raw_value.ends_with(quote) {
                return Err("unterminated quoted value".to_string());
            }
            raw_value[1..raw_value.len() - 1].to_string()
        }
        _ => raw_value.to_string(),
    };

    Ok(Some((key.to_string(), value)))
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
