//! One plugin invocation.
//!
//! A [`Session`] owns the host handle, the variable catalog (with its name
//! trie) and the configuration for exactly one call from the host.  Building
//! the catalog is the only setup step; once a `Session` exists every accessor
//! can run.  Dropping it, or calling [`Session::finish`], releases the catalog
//! and trie so nothing leaks into the next invocation.
//!
//! ```rust
//! use stplugin::{BridgeConfig, MemoryHost, Session, Value};
//!
//! let mut host = MemoryHost::new().with_numeric("price", vec![4099.0, 4749.0]);
//! let mut s = Session::begin(&mut host, BridgeConfig::default()).unwrap();
//! assert_eq!(s.read_cell(-1, "pr").unwrap(), Value::Number(4749.0));
//! s.write_cell(0, "price", 5000.0).unwrap();
//! ```

use crate::catalog::VariableCatalog;
use crate::config::BridgeConfig;
use crate::error::BridgeResult;
use crate::host::Host;

pub struct Session<H: Host> {
    pub(crate) host: H,
    pub(crate) catalog: VariableCatalog,
    pub(crate) config: BridgeConfig,
}

impl<H: Host> Session<H> {
    /// Start an invocation: read the variable catalog from `host`.
    ///
    /// On failure the error is shown once on the host's error channel and
    /// returned; nothing else may run in this invocation.
    pub fn begin(mut host: H, config: BridgeConfig) -> BridgeResult<Self> {
        match VariableCatalog::load(&host, &config) {
            Ok(catalog) => Ok(Self { host, catalog, config }),
            Err(e) => {
                host.display_error(&format!("{e}\n"));
                Err(e)
            }
        }
    }

    /// Start an invocation with a catalog that was built separately.
    pub fn with_catalog(host: H, catalog: VariableCatalog, config: BridgeConfig) -> Self {
        Self { host, catalog, config }
    }

    pub fn catalog(&self) -> &VariableCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// End the invocation, discarding the catalog, and hand back the host.
    pub fn finish(self) -> H {
        log::debug!("session finished; dropping catalog of {} names", self.catalog.len());
        self.host
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
