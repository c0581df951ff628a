//! Bridge between a statistics host's data store and an embedded scripting
//! engine.
//!
//! A plugin invocation starts by reading the host's variable catalog into a
//! [`Session`].  Scripts then read and write observations, variables,
//! matrices, scalars and macros through it, using zero-based indices
//! (negative ones count from the end) and variable names that may be
//! abbreviated to any unique prefix.
//!
//! | Module | Role |
//! |--------|------|
//! | [`trie`] | prefix-counting name resolver |
//! | [`catalog`] | per-invocation variable list |
//! | [`index`] | zero-based / negative index translation |
//! | [`missing`] | the host's 27 missing-value sentinels |
//! | [`value`] | values exchanged with scripts |
//! | [`session`], [`accessor`], [`bulk`] | typed data access |
//! | [`view`] | filtered row/variable views, whole matrices |
//! | [`dispatch`] | call table for script bindings |
//! | [`names`] | name and format validation |
//! | [`host`] | the host contract plus in-memory and C bindings |
//! | [`config`] | bridge configuration |
//! | [`python`] | `stata_plugin` Python module (feature `python`) |
//!
//! ```rust
//! use stplugin::{BridgeConfig, ErrorKind, MemoryHost, Session, Value};
//!
//! let mut host = MemoryHost::new()
//!     .with_numeric("income", vec![52.0, 61.5])
//!     .with_numeric("incomeSq", vec![2704.0, 3782.25])
//!     .with_numeric("id", vec![1.0, 2.0]);
//! let s = Session::begin(&mut host, BridgeConfig::default()).unwrap();
//!
//! assert_eq!(s.read_cell(-1, "income").unwrap(), Value::Number(61.5));
//! assert_eq!(s.resolve_variable("incomeS").unwrap(), 1);
//! assert_eq!(s.resolve_variable("i").unwrap_err().kind(), ErrorKind::AmbiguousAbbreviation);
//! ```

pub mod accessor;
pub mod bulk;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod index;
pub mod missing;
pub mod names;
pub mod python;
pub mod session;
pub mod trie;
pub mod value;
pub mod view;

pub use accessor::VarRef;
pub use catalog::VariableCatalog;
pub use config::{BridgeConfig, IllegalNamePolicy};
pub use error::{BridgeError, BridgeResult, ErrorKind, HostStatus};
pub use host::ffi::{ForeignHost, HostTable};
pub use host::memory::MemoryHost;
pub use host::Host;
pub use index::Axis;
pub use missing::MissingValue;
pub use session::Session;
pub use trie::NameTrie;
pub use value::{SetValue, Value};
pub use view::{Select, View};
