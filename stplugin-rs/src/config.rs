//! Bridge configuration.
//!
//! Defaults match the host-side wrapper: the variable count is published in
//! `__pynallvars`, the names in `__pyallvars0`, `__pyallvars1`, …, and local
//! macros are stored under a leading `_`.
//!
//! A config file is a list of `key = value` lines:
//!
//! | Key | Meaning | Default |
//! |-----|---------|---------|
//! | `count_macro` | macro holding the variable count | `__pynallvars` |
//! | `name_macro_prefix` | prefix of the per-variable name macros | `__pyallvars` |
//! | `local_prefix` | prefix that turns a local name into a host macro name | `_` |
//! | `local_name_max` | characters of a local name kept | `31` |
//! | `text_limit` | byte limit of host text buffers | `244` |
//! | `max_variables` | largest variable count accepted | `32767` |
//! | `abbreviate` | whether variable names may be abbreviated | `true` |
//! | `illegal_names` | `reject` or `truncate` catalog names with illegal characters | `reject` |
//!
//! Lines starting with `;` or `#` are comments.

use std::path::{Path, PathBuf};

use crate::value::TEXT_LIMIT;

pub const DEFAULT_COUNT_MACRO: &str = "__pynallvars";
pub const DEFAULT_NAME_MACRO_PREFIX: &str = "__pyallvars";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "STPLUGIN_CONFIG";
/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "stplugin.conf";

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// What to do with a catalog name containing a character outside the
/// variable-name alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IllegalNamePolicy {
    /// Fail catalog construction.
    #[default]
    Reject,
    /// Insert the name into the trie only up to the offending character.
    Truncate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub count_macro: String,
    pub name_macro_prefix: String,
    pub local_prefix: String,
    pub local_name_max: usize,
    pub text_limit: usize,
    pub max_variables: usize,
    pub abbreviate: bool,
    pub illegal_names: IllegalNamePolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            count_macro: DEFAULT_COUNT_MACRO.to_owned(),
            name_macro_prefix: DEFAULT_NAME_MACRO_PREFIX.to_owned(),
            local_prefix: "_".to_owned(),
            local_name_max: 31,
            text_limit: TEXT_LIMIT,
            max_variables: 32767,
            abbreviate: true,
            illegal_names: IllegalNamePolicy::Reject,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the macro holding variable `i`'s name.
    pub fn name_macro(&self, i: usize) -> String {
        format!("{}{i}", self.name_macro_prefix)
    }

    /// Host macro name for local `name`: the prefix plus at most
    /// `local_name_max` characters.
    pub fn local_macro(&self, name: &str) -> String {
        let mut out = self.local_prefix.clone();
        out.extend(name.chars().take(self.local_name_max));
        out
    }

    /// Parse a config string.
    ///
    /// Bad lines are reported and skipped; the rest still apply.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = BridgeConfig::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                errors.push(ConfigError {
                    line: lineno,
                    message: format!("expected key = value, got {line:?}"),
                });
                continue;
            };
            if let Err(message) = config.apply(key.trim(), value.trim()) {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Load the first config file found, or the defaults.
    ///
    /// Search order: `$STPLUGIN_CONFIG` → `./stplugin.conf` → the per-user
    /// config directory → built-in defaults.  Errors in the file are logged
    /// and skipped.
    pub fn discover() -> Self {
        let Some(path) = find_config_file() else {
            return Self::default();
        };
        match Self::load_file(&path) {
            Ok((config, errors)) => {
                for e in &errors {
                    log::warn!("{}: {e}", path.display());
                }
                log::debug!("loaded bridge config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("cannot read {}: {e}", path.display());
                Self::default()
            }
        }
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "count_macro" => self.count_macro = non_empty(key, value)?,
            "name_macro_prefix" => self.name_macro_prefix = non_empty(key, value)?,
            "local_prefix" => self.local_prefix = non_empty(key, value)?,
            "local_name_max" => self.local_name_max = parse_count(key, value)?,
            "text_limit" => self.text_limit = parse_count(key, value)?,
            "max_variables" => self.max_variables = parse_count(key, value)?,
            "abbreviate" => self.abbreviate = parse_bool(key, value)?,
            "illegal_names" => {
                self.illegal_names = match value {
                    "reject" => IllegalNamePolicy::Reject,
                    "truncate" => IllegalNamePolicy::Truncate,
                    _ => return Err(format!("{key}: expected reject or truncate, got {value:?}")),
                }
            }
            _ => return Err(format!("unknown key {key:?}")),
        }
        Ok(())
    }
}

/// Locate the config file per [`BridgeConfig::discover`]'s search order.
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(p));
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    directories::ProjectDirs::from("", "", "stplugin")
        .map(|dirs| dirs.config_dir().join(LOCAL_CONFIG_FILE))
        .filter(|p| p.exists())
}

fn non_empty(key: &str, value: &str) -> Result<String, String> {
    if value.is_empty() {
        Err(format!("{key}: value cannot be empty"))
    } else {
        Ok(value.to_owned())
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("{key}: expected a positive integer, got {value:?}")),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("{key}: expected a boolean, got {value:?}")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = BridgeConfig::default();
        assert_eq!(c.name_macro(3), "__pyallvars3");
        assert_eq!(c.text_limit, 244);
        assert!(c.abbreviate);
        assert_eq!(c.illegal_names, IllegalNamePolicy::Reject);
    }

    #[test]
    fn local_names_are_prefixed_and_cut() {
        let c = BridgeConfig::default();
        assert_eq!(c.local_macro("tmp"), "_tmp");
        let long = "a".repeat(40);
        assert_eq!(c.local_macro(&long).len(), 32);
    }

    #[test]
    fn key_value_lines() {
        let (c, errs) = BridgeConfig::load_str(
            "; comment\n\
             # also a comment\n\
             \n\
             abbreviate = no\n\
             illegal_names = truncate\n\
             count_macro=__nvars\n",
        );
        assert!(errs.is_empty(), "{errs:?}");
        assert!(!c.abbreviate);
        assert_eq!(c.illegal_names, IllegalNamePolicy::Truncate);
        assert_eq!(c.count_macro, "__nvars");
    }

    #[test]
    fn bad_lines_reported_with_numbers() {
        let (c, errs) = BridgeConfig::load_str(
            "text_limit = 80\n\
             bogus\n\
             colour = blue\n\
             max_variables = -1\n",
        );
        assert_eq!(c.text_limit, 80);
        assert_eq!(c.max_variables, 32767);
        let lines: Vec<usize> = errs.iter().map(|e| e.line).collect();
        assert_eq!(lines, [2, 3, 4]);
        assert!(errs[1].to_string().starts_with("line 3: unknown key"));
    }

    #[test]
    fn load_file_reads_disk() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "local_prefix = _L").unwrap();
        let (c, errs) = BridgeConfig::load_file(f.path()).unwrap();
        assert!(errs.is_empty());
        assert_eq!(c.local_macro("x"), "_Lx");
    }

    #[test]
    fn load_file_missing_is_io_error() {
        assert!(BridgeConfig::load_file(Path::new("/nonexistent/stplugin.conf")).is_err());
    }
}
