//! Host naming and display-format rules.
//!
//! Pure string checks, usable before anything is sent to the host.
//!
//! | Function | Accepts |
//! |----------|---------|
//! | [`is_name`] | a letter or `_`, then up to 31 of `_a-zA-Z0-9` |
//! | [`is_varname`] | a name that is not reserved and not a `str<N>` type |
//! | [`is_lmname`] | 1 to 31 of `_a-zA-Z0-9` (local macro names) |
//! | [`is_fmt`] | any display format |
//! | [`is_numfmt`] | a display format that is not a string format |
//! | [`is_strfmt`] | `%[-~][0]Ns` with `1 <= N <= 244` |

use std::sync::OnceLock;

use regex::Regex;

use crate::value::TEXT_LIMIT;

/// Words that cannot be variable names.
pub const RESERVED: [&str; 19] = [
    "_all", "_b", "byte", "_coef", "_cons", "double", "float", "if", "in", "int", "long", "_n",
    "_N", "_pi", "_pred", "_rc", "_skip", "using", "with",
];

const NAME: &str = r"^[_a-zA-Z][_a-zA-Z0-9]{0,31}$";
const LMNAME: &str = r"^[_a-zA-Z0-9]{1,31}$";
const STRING_TYPE: &str = r"^str[0-9]+$";
const NUM_FMT: &str = r"^%(-)?(0)?([0-9]+)(\.|,)([0-9]+)(f|g|e)(c)?$";
const STR_FMT: &str = r"^%(-|~)?(0)?([0-9]+)s$";

/// Date and time components allowed after `%t?` and `%tb...:`.
const DATE_DETAILS: &str = concat!(
    r"CC|cc|YY|yy|JJJ|jjj|Month|Mon|month|mon|NN|nn|DD|dd|DAYNAME|Dayname|Day|Da|",
    r"day|da|q|WW|ww|HH|Hh|hH|hh|h|MM|mm|SS|ss|\.sss|\.ss|\.s|am|a\.m\.|AM|A\.M\.|",
    r"\.|,|:|-|\\|_|\+|/|!."
);

type Cache = OnceLock<Option<Regex>>;

/// Compile `pattern` once; a pattern that fails to compile matches nothing.
fn compiled(cell: &'static Cache, pattern: impl FnOnce() -> String) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(&pattern()).ok()).as_ref()
}

fn name_re() -> Option<&'static Regex> {
    static RE: Cache = OnceLock::new();
    compiled(&RE, || NAME.to_owned())
}

fn lmname_re() -> Option<&'static Regex> {
    static RE: Cache = OnceLock::new();
    compiled(&RE, || LMNAME.to_owned())
}

fn string_type_re() -> Option<&'static Regex> {
    static RE: Cache = OnceLock::new();
    compiled(&RE, || STRING_TYPE.to_owned())
}

fn num_fmt_re() -> Option<&'static Regex> {
    static RE: Cache = OnceLock::new();
    compiled(&RE, || NUM_FMT.to_owned())
}

fn str_fmt_re() -> Option<&'static Regex> {
    static RE: Cache = OnceLock::new();
    compiled(&RE, || STR_FMT.to_owned())
}

fn time_fmt_re() -> Option<&'static Regex> {
    static RE: Cache = OnceLock::new();
    compiled(&RE, || format!(r"^%(-)?t(c|C|d|w|m|q|h|y|g)({DATE_DETAILS})*$"))
}

fn tb_fmt_re() -> Option<&'static Regex> {
    static RE: Cache = OnceLock::new();
    compiled(&RE, || format!(r"^%(-)?tb([^:]*)(:({DATE_DETAILS})*)?$"))
}

fn matches(re: Option<&Regex>, s: &str) -> bool {
    re.is_some_and(|re| re.is_match(s))
}

// ── Names ─────────────────────────────────────────────────────────────────────

pub fn is_name(name: &str) -> bool {
    matches(name_re(), name)
}

pub fn is_varname(name: &str) -> bool {
    !RESERVED.contains(&name) && !matches(string_type_re(), name) && is_name(name)
}

pub fn is_lmname(name: &str) -> bool {
    matches(lmname_re(), name)
}

// ── Formats ───────────────────────────────────────────────────────────────────

/// Whether `fmt` is any valid display format.  Surrounding whitespace is
/// ignored.  Business-calendar names are not checked.
pub fn is_fmt(fmt: &str) -> bool {
    let fmt = fmt.trim();
    let Some(body) = fmt.strip_prefix('%') else {
        return false;
    };
    let unsigned = body.strip_prefix('-').unwrap_or(body);

    if unsigned.starts_with("tb") {
        return matches(tb_fmt_re(), fmt);
    }
    if unsigned.starts_with('t') {
        return matches(time_fmt_re(), fmt);
    }
    match fmt.chars().last() {
        Some('s') => is_strfmt(fmt),
        // Binary: only %8H, %16H, %8L, %16L (a leading - is tolerated).
        Some('H' | 'L') => matches!(&body[..body.len() - 1], "8" | "16" | "-8" | "-16"),
        Some('x') => fmt == "%21x" || fmt == "%-12x",
        Some('f' | 'g' | 'e' | 'c') => is_numeric_width_ok(fmt),
        _ => false,
    }
}

fn is_numeric_width_ok(fmt: &str) -> bool {
    let Some(caps) = num_fmt_re().and_then(|re| re.captures(fmt)) else {
        return false;
    };
    let width: usize = caps[3].parse().unwrap_or(0);
    let decimals: usize = caps[5].parse().unwrap_or(usize::MAX);
    width != 0 && width > decimals && width <= TEXT_LIMIT
}

pub fn is_numfmt(fmt: &str) -> bool {
    is_fmt(fmt) && !is_strfmt(fmt)
}

pub fn is_strfmt(fmt: &str) -> bool {
    let Some(caps) = str_fmt_re().and_then(|re| re.captures(fmt)) else {
        return false;
    };
    let width: usize = caps[3].parse().unwrap_or(0);
    (1..=TEXT_LIMIT).contains(&width)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
