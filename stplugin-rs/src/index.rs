//! Index translation between the script side and the host.
//!
//! Scripts address observations, variables and matrix rows/columns with
//! zero-based indices that may be negative (`-1` is the last element).  The
//! host uses one-based positive indices.  [`translate`] validates and wraps a
//! caller index into a zero-based *effective* index; [`host_index`] is the one
//! place where the host's `+1` offset is applied.

use std::fmt;

use crate::error::{BridgeError, BridgeResult};

/// Which quantity an index addresses.  Only used to pick the bound and to
/// name the axis in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Observation,
    Variable,
    MatrixRow,
    MatrixCol,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::Observation => "observation",
            Axis::Variable => "variable",
            Axis::MatrixRow => "matrix row",
            Axis::MatrixCol => "matrix column",
        })
    }
}

/// Validate `index` against cardinality `count` and return the zero-based
/// effective index.
///
/// Fails with `OutOfRange` when `index < -count` or `index >= count`.
pub fn translate(index: i64, count: usize, axis: Axis) -> BridgeResult<usize> {
    let n = count as i64;
    if index < -n || index >= n {
        return Err(BridgeError::OutOfRange { axis, index, count });
    }
    let effective = if index < 0 { n + index } else { index };
    Ok(effective as usize)
}

/// Convert a validated zero-based index to the host's one-based index.
#[inline]
pub fn host_index(effective: usize) -> i32 {
    effective as i32 + 1
}

/// Convert a one-based host index back to zero-based.  Host values below 1
/// clamp to 0.
#[inline]
pub fn from_host(one_based: i32) -> usize {
    one_based.saturating_sub(1).max(0) as usize
}

/// Clamp a host-reported count (which is signed) to a usable cardinality.
#[inline]
pub(crate) fn count_from_host(n: i32) -> usize {
    n.max(0) as usize
}

// ── Tests ─────────────────────────────────────────────────────────────────────
