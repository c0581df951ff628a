//! Per-invocation variable catalog.
//!
//! The host does not expose its variable list directly.  Before calling the
//! plugin, the host-side wrapper publishes the variable count in one macro and
//! each name in its own numbered macro.  [`VariableCatalog::load`] reads them
//! back and builds the [`NameTrie`] over the names.

use crate::config::{BridgeConfig, IllegalNamePolicy};
use crate::error::{BridgeError, BridgeResult};
use crate::host::Host;
use crate::trie::{symbol_index, NameTrie};

/// Longest variable name the host allows.
pub const NAME_LIMIT: usize = 32;

/// Ordered variable names plus their resolver.
#[derive(Debug, Clone, Default)]
pub struct VariableCatalog {
    names: Vec<String>,
    trie: NameTrie,
}

impl VariableCatalog {
    /// Build a catalog from names already in hand.
    pub fn from_names<I, S>(names: I, policy: IllegalNamePolicy) -> BridgeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = VariableCatalog::default();
        for name in names {
            catalog.push(name.into(), policy)?;
        }
        Ok(catalog)
    }

    /// Read the published catalog macros from the host.
    ///
    /// An empty or undefined count macro means zero variables.
    pub fn load<H: Host + ?Sized>(host: &H, config: &BridgeConfig) -> BridgeResult<Self> {
        let raw = host
            .read_macro(&config.count_macro, config.text_limit)
            .map_err(|rc| BridgeError::host("read catalog count", config.count_macro.clone(), rc))?;
        let count = parse_count(raw.trim(), config)?;

        let mut catalog = VariableCatalog::default();
        catalog.names.reserve(count);
        for i in 0..count {
            let macro_name = config.name_macro(i);
            let name = host
                .read_macro(&macro_name, NAME_LIMIT + 1)
                .map_err(|rc| BridgeError::host("read catalog name", macro_name.clone(), rc))?;
            catalog.push(name.trim().to_owned(), config.illegal_names)?;
        }
        log::debug!(
            "variable catalog: {} names, {} trie nodes",
            catalog.len(),
            catalog.trie.node_count()
        );
        Ok(catalog)
    }

    fn push(&mut self, name: String, policy: IllegalNamePolicy) -> BridgeResult<()> {
        let index = self.names.len();
        if name.is_empty() {
            return Err(BridgeError::InvalidName(format!("variable {index} has an empty name")));
        }
        if let Some(bad) = name.chars().find(|&c| symbol_index(c).is_none()) {
            match policy {
                IllegalNamePolicy::Reject => {
                    log::warn!("rejecting catalog name {name:?}");
                    return Err(BridgeError::InvalidName(format!(
                        "variable {index} name {name:?} contains illegal character {bad:?}"
                    )));
                }
                IllegalNamePolicy::Truncate => {
                    log::warn!("catalog name {name:?} truncated at {bad:?}");
                }
            }
        }
        self.trie.insert(&name, index);
        self.names.push(name);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name at a zero-based effective index.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Resolve a name or abbreviation to its index.
    pub fn resolve(&self, query: &str, allow_abbreviation: bool) -> BridgeResult<usize> {
        self.trie.resolve(query, allow_abbreviation)
    }
}

fn parse_count(raw: &str, config: &BridgeConfig) -> BridgeResult<usize> {
    if raw.is_empty() {
        return Ok(0);
    }
    let n: i64 = raw.parse().map_err(|_| {
        BridgeError::Catalog(format!("{} is not a number: {raw:?}", config.count_macro))
    })?;
    if n < 0 || n as u64 > config.max_variables as u64 {
        return Err(BridgeError::Catalog(format!(
            "{} = {n} is outside 0..={}",
            config.count_macro, config.max_variables
        )));
    }
    Ok(n as usize)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::host::memory::{HostOp, MemoryHost};

    #[test]
    fn loads_published_names() {
        let host = MemoryHost::new()
            .with_numeric("income", vec![1.0])
            .with_numeric("id", vec![2.0]);
        let cat = VariableCatalog::load(&host, &BridgeConfig::default()).unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.name(1), Some("id"));
        assert_eq!(cat.resolve("in", true).unwrap(), 0);
        assert_eq!(cat.names().collect::<Vec<_>>(), ["income", "id"]);
    }

    #[test]
    fn undefined_count_means_empty() {
        let host = MemoryHost::new();
        let cat = VariableCatalog::load(&host, &BridgeConfig::default()).unwrap();
        assert!(cat.is_empty());
    }

    #[test]
    fn bad_count_is_catalog_error() {
        let config = BridgeConfig::default();
        for raw in ["12x", "-1", "40000"] {
            let host = MemoryHost::new().with_macro("__pynallvars", raw);
            let err = VariableCatalog::load(&host, &config).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Catalog, "{raw}");
        }
    }

    #[test]
    fn host_failure_is_reported() {
        let mut host = MemoryHost::new().with_numeric("x", vec![]);
        host.fail_on(HostOp::ReadMacro, 3);
        let err = VariableCatalog::load(&host, &BridgeConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HostAccess);
    }

    #[test]
    fn missing_name_macro_is_invalid() {
        let host = MemoryHost::new().with_macro("__pynallvars", "1");
        let err = VariableCatalog::load(&host, &BridgeConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn illegal_names_rejected_by_default() {
        let err =
            VariableCatalog::from_names(["ok", "not-ok"], IllegalNamePolicy::Reject).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn illegal_names_truncated_on_request() {
        let cat = VariableCatalog::from_names(["ab-c", "xy"], IllegalNamePolicy::Truncate).unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.name(0), Some("ab-c"));
        assert_eq!(cat.resolve("xy", false).unwrap(), 1);
        assert_eq!(cat.resolve("ab", true).unwrap_err().kind(), ErrorKind::InternalInconsistency);
    }
}
