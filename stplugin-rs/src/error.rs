//! Error kinds surfaced by every bridge operation.
//!
//! Nothing here is retried.  Each failure is reported at the point where it is
//! detected and handed back to the caller as a [`BridgeError`].

use std::fmt;

use crate::index::Axis;

/// Raw non-zero status code returned by a host call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostStatus(pub i32);

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r({})", self.0)
    }
}

impl HostStatus {
    /// Map a C-style return code to `Ok(())` (zero) or `Err` (non-zero).
    pub fn check(rc: i32) -> Result<(), HostStatus> {
        if rc == 0 { Ok(()) } else { Err(HostStatus(rc)) }
    }
}

/// Discriminant of a [`BridgeError`], for callers that branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidName,
    OutOfRange,
    NotFound,
    AmbiguousAbbreviation,
    TypeMismatch,
    HostAccess,
    InternalInconsistency,
    InvalidFormat,
    DimensionMismatch,
    Catalog,
}

/// A structured failure from the bridge.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("{0}")]
    InvalidName(String),
    #[error("{axis} index {index} out of range")]
    OutOfRange { axis: Axis, index: i64, count: usize },
    #[error("{0}")]
    NotFound(String),
    #[error("ambiguous abbreviation: {0}")]
    AmbiguousAbbreviation(String),
    #[error("{0}")]
    TypeMismatch(String),
    #[error("error in {operation} ({address}): host returned {status}")]
    HostAccess { operation: &'static str, address: String, status: HostStatus },
    #[error("internal error: {0}")]
    InternalInconsistency(String),
    #[error("{0}")]
    InvalidFormat(String),
    #[error("{0}")]
    DimensionMismatch(String),
    #[error("cannot build variable catalog: {0}")]
    Catalog(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::InvalidName(_) => ErrorKind::InvalidName,
            BridgeError::OutOfRange { .. } => ErrorKind::OutOfRange,
            BridgeError::NotFound(_) => ErrorKind::NotFound,
            BridgeError::AmbiguousAbbreviation(_) => ErrorKind::AmbiguousAbbreviation,
            BridgeError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            BridgeError::HostAccess { .. } => ErrorKind::HostAccess,
            BridgeError::InternalInconsistency(_) => ErrorKind::InternalInconsistency,
            BridgeError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            BridgeError::DimensionMismatch(_) => ErrorKind::DimensionMismatch,
            BridgeError::Catalog(_) => ErrorKind::Catalog,
        }
    }

    pub(crate) fn host(
        operation: &'static str,
        address: impl Into<String>,
        status: HostStatus,
    ) -> Self {
        let address = address.into();
        log::warn!("host call {operation} failed at {address}: {status}");
        BridgeError::HostAccess { operation, address, status }
    }

    pub(crate) fn type_mismatch(msg: impl Into<String>) -> Self {
        BridgeError::TypeMismatch(msg.into())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
