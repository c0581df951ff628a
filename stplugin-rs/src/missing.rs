//! Host missing-value sentinels.
//!
//! The host marks missing numeric data with doubles in a reserved band just
//! above `2^1023`.  There is one generic sentinel (`.`) and 26 extended ones
//! (`.a` … `.z`), laid out as `(1 + k/4096) * 2^1023` for `k = 0..=26`.
//!
//! A [`MissingValue`] carries the sentinel double itself, not just the code,
//! so any band value read from the host goes back out bit-for-bit unchanged.

use std::cmp::Ordering;
use std::fmt;

use crate::value::{SetValue, Value};

/// Everything strictly above this is missing.
pub const MISSING_THRESHOLD: f64 = 8.988465674311579e+307;
/// Checked symmetrically; only `-inf` actually falls below it.
pub const NEGATIVE_THRESHOLD: f64 = -1.7976931348623157e+308;
/// Number of sentinel codes the host defines (`.` plus `.a`–`.z`).
pub const CODE_COUNT: u8 = 27;

const SENTINEL_BASE_BITS: u64 = 0x7FE0_0000_0000_0000;
const CODE_SHIFT: u32 = 40;

/// `true` iff `value` lies in the host's missing band.
#[inline]
pub fn is_missing(value: f64) -> bool {
    value > MISSING_THRESHOLD || value < NEGATIVE_THRESHOLD
}

/// Host double → script value.
pub fn to_external(value: f64) -> Value {
    match MissingValue::from_raw(value) {
        Some(mv) => Value::Missing(mv),
        None => Value::Number(value),
    }
}

/// Script value → host double.  `Absent` becomes the generic sentinel.
pub fn from_external(value: SetValue) -> f64 {
    match value {
        SetValue::Number(x) => x,
        SetValue::Missing(mv) => mv.raw(),
        SetValue::Absent => MissingValue::GENERIC.raw(),
    }
}

/// One missing sentinel, stored as its exact host double.
#[derive(Clone, Copy)]
pub struct MissingValue {
    raw: f64,
}

impl MissingValue {
    /// The generic missing value, `.`.
    pub const GENERIC: MissingValue = MissingValue { raw: 8.98846567431158e307 };

    /// The sentinel for code `k` (0 = `.`, 1 = `.a`, …, 26 = `.z`).
    pub fn new(code: u8) -> Option<Self> {
        (code < CODE_COUNT).then(|| MissingValue {
            raw: f64::from_bits(SENTINEL_BASE_BITS | ((code as u64) << CODE_SHIFT)),
        })
    }

    /// The sentinel for letter `'a'..='z'`.
    pub fn from_letter(letter: char) -> Option<Self> {
        if letter.is_ascii_lowercase() {
            Self::new(letter as u8 - b'a' + 1)
        } else {
            None
        }
    }

    /// Wrap a band double as-is.  Returns `None` outside the band.
    pub fn from_raw(raw: f64) -> Option<Self> {
        is_missing(raw).then_some(MissingValue { raw })
    }

    /// Nearest recognised sentinel for an arbitrary double: anything outside
    /// the recognised `.`–`.z` range (including ordinary numbers) maps to the
    /// generic value.
    pub fn classify(value: f64) -> Self {
        MissingValue { raw: value }
            .code()
            .and_then(Self::new)
            .unwrap_or(Self::GENERIC)
    }

    /// The exact host double.
    pub fn raw(self) -> f64 {
        self.raw
    }

    /// Recognised code `0..=26`, or `None` for band values that are not one
    /// of the 27 sentinels.
    pub fn code(self) -> Option<u8> {
        let bits = self.raw.to_bits();
        let low_mask = (1u64 << CODE_SHIFT) - 1;
        let base = bits & !(0xFFu64 << CODE_SHIFT) & !low_mask;
        if base != SENTINEL_BASE_BITS || bits & low_mask != 0 {
            return None;
        }
        let code = ((bits >> CODE_SHIFT) & 0xFF) as u8;
        (code < CODE_COUNT).then_some(code)
    }

    /// Display name: `.`, `.a` … `.z`.  Unrecognised band values show as `.`.
    pub fn name(self) -> String {
        match self.code() {
            Some(0) | None => ".".to_owned(),
            Some(k) => format!(".{}", (b'a' + k - 1) as char),
        }
    }

    /// `true` for the generic `.` sentinel.
    pub fn is_generic(self) -> bool {
        self.code() == Some(0)
    }
}

impl PartialEq for MissingValue {
    fn eq(&self, other: &Self) -> bool {
        self.raw.to_bits() == other.raw.to_bits()
    }
}

impl Eq for MissingValue {}

impl PartialOrd for MissingValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MissingValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.total_cmp(&other.raw)
    }
}

impl std::hash::Hash for MissingValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.to_bits().hash(state);
    }
}

impl fmt::Debug for MissingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MissingValue({}, {:#018x})", self.name(), self.raw.to_bits())
    }
}

impl fmt::Display for MissingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
