//! Call-table surface for embedded scripting engines.
//!
//! Script bindings see the bridge as a set of named functions taking a loose
//! argument list (`st_global("x")` reads, `st_global("x", "1")` writes).
//! [`call`] checks the arity and argument shapes, then routes to the typed
//! [`Session`] accessors.
//!
//! | Function | Arguments | Result |
//! |----------|-----------|--------|
//! | `st_nobs`, `st_nvar` | none | count |
//! | `_st_data` / `_st_sdata` | obs, var | cell value |
//! | `_st_store` / `_st_sstore` | obs, var, value | none |
//! | `st_matrix_el` | name, row, col \[, value\] | element / none |
//! | `st_rows`, `st_cols` | name | dimension |
//! | `st_global`, `st_local` | name \[, text\] | text / none |
//! | `st_numscalar` | name \[, value\] | value / none |
//! | `st_varindex` | name \[, allow abbreviation\] | index |
//! | `st_varname` | index | name |
//! | `st_isnumvar`, `st_isstrvar` | var | bool |
//! | `st_ifobs` | obs | bool |
//! | `st_in1`, `st_in2` | none | range bound |
//! | `st_ismissing` | any | bool |
//! | `st_format` | format, value | text |
//! | `_st_display`, `_st_error` | text | none |
//! | `st_isname`, `st_isvarname`, `st_islmname` | text | bool |
//! | `st_isfmt`, `st_isnumfmt`, `st_isstrfmt` | text | bool |

use crate::accessor::VarRef;
use crate::error::{BridgeError, BridgeResult};
use crate::host::Host;
use crate::missing::{self, MissingValue};
use crate::names;
use crate::session::Session;
use crate::value::{SetValue, Value};

/// One argument from the scripting side.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Missing(MissingValue),
}

impl Arg {
    fn type_name(&self) -> &'static str {
        match self {
            Arg::None => "None",
            Arg::Bool(_) => "bool",
            Arg::Int(_) => "int",
            Arg::Float(_) => "float",
            Arg::Str(_) => "str",
            Arg::Missing(_) => "missing value",
        }
    }

    fn int(&self, what: &str) -> BridgeResult<i64> {
        match self {
            Arg::Int(i) => Ok(*i),
            other => Err(BridgeError::type_mismatch(format!(
                "{what} should be int, not {}",
                other.type_name()
            ))),
        }
    }

    fn str(&self, what: &str) -> BridgeResult<&str> {
        match self {
            Arg::Str(s) => Ok(s),
            other => Err(BridgeError::type_mismatch(format!(
                "{what} should be str, not {}",
                other.type_name()
            ))),
        }
    }

    fn var(&self) -> BridgeResult<VarRef> {
        match self {
            Arg::Int(i) => Ok(VarRef::Index(*i)),
            Arg::Str(s) => Ok(VarRef::Name(s.clone())),
            _ => Err(BridgeError::type_mismatch(
                "variable should be specified with single int or str",
            )),
        }
    }

    fn set_value(&self) -> BridgeResult<SetValue> {
        match self {
            Arg::Float(x) => Ok(SetValue::Number(*x)),
            Arg::Int(i) => Ok(SetValue::Number(*i as f64)),
            Arg::Bool(b) => Ok(SetValue::Number(f64::from(u8::from(*b)))),
            Arg::None => Ok(SetValue::Absent),
            Arg::Missing(mv) => Ok(SetValue::Missing(*mv)),
            Arg::Str(_) => Err(BridgeError::type_mismatch(
                "value must be number, absent, or missing-code",
            )),
        }
    }

    /// Script-style truthiness.
    fn truthy(&self) -> bool {
        match self {
            Arg::None => false,
            Arg::Bool(b) => *b,
            Arg::Int(i) => *i != 0,
            Arg::Float(x) => *x != 0.0,
            Arg::Str(s) => !s.is_empty(),
            Arg::Missing(_) => true,
        }
    }
}

impl From<i64> for Arg {
    fn from(i: i64) -> Self {
        Arg::Int(i)
    }
}

impl From<i32> for Arg {
    fn from(i: i32) -> Self {
        Arg::Int(i64::from(i))
    }
}

impl From<f64> for Arg {
    fn from(x: f64) -> Self {
        Arg::Float(x)
    }
}

impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Arg::Bool(b)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Str(s.to_owned())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Str(s)
    }
}

impl From<MissingValue> for Arg {
    fn from(mv: MissingValue) -> Self {
        Arg::Missing(mv)
    }
}

/// Result of a dispatched call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    None,
    Bool(bool),
    Int(i64),
    Value(Value),
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        Reply::Value(v)
    }
}

/// Names accepted by [`call`].
pub const FUNCTIONS: [&str; 29] = [
    "st_nobs", "st_nvar", "_st_data", "_st_store", "_st_sdata", "_st_sstore", "st_matrix_el",
    "st_rows", "st_cols", "st_global", "st_local", "st_numscalar", "st_varindex", "st_varname",
    "st_isnumvar", "st_isstrvar", "st_ifobs", "st_in1", "st_in2", "st_ismissing", "st_format",
    "_st_display", "_st_error", "st_isname", "st_isvarname", "st_islmname", "st_isfmt",
    "st_isnumfmt", "st_isstrfmt",
];

fn arity(func: &str, args: &[Arg], n: usize) -> BridgeResult<()> {
    if args.len() == n {
        return Ok(());
    }
    let plural = if n == 1 { "" } else { "s" };
    Err(BridgeError::type_mismatch(match n {
        0 => format!("{func}() takes no arguments"),
        _ => format!("{func}() takes exactly {n} argument{plural}"),
    }))
}

fn get_or_set(func: &str, args: &[Arg], get: usize) -> BridgeResult<bool> {
    match args.len() {
        n if n == get => Ok(false),
        n if n == get + 1 => Ok(true),
        _ => {
            let plural = if get == 1 { "" } else { "s" };
            Err(BridgeError::type_mismatch(format!(
                "{func}() takes {get} argument{plural} for getting or {} for setting",
                get + 1
            )))
        }
    }
}

/// Run the bridge function `func` with `args`.
pub fn call<H: Host>(session: &mut Session<H>, func: &str, args: &[Arg]) -> BridgeResult<Reply> {
    log::trace!("dispatch {func}({} args)", args.len());
    match func {
        "st_nobs" => {
            arity(func, args, 0)?;
            Ok(Reply::Int(session.observation_count() as i64))
        }
        "st_nvar" => {
            arity(func, args, 0)?;
            Ok(Reply::Int(session.variable_count() as i64))
        }
        "_st_data" => {
            arity(func, args, 2)?;
            Ok(session.read_cell(args[0].int("observation")?, args[1].var()?)?.into())
        }
        "_st_sdata" => {
            arity(func, args, 2)?;
            let s = session.read_text_cell(args[0].int("observation")?, args[1].var()?)?;
            Ok(Reply::Value(Value::Text(s)))
        }
        "_st_store" => {
            arity(func, args, 3)?;
            let value = args[2].set_value()?;
            session.write_cell(args[0].int("observation")?, args[1].var()?, value)?;
            Ok(Reply::None)
        }
        "_st_sstore" => {
            arity(func, args, 3)?;
            let value = args[2].str("value")?;
            session.write_text_cell(args[0].int("observation")?, args[1].var()?, value)?;
            Ok(Reply::None)
        }
        "st_matrix_el" => {
            let set = get_or_set(func, args, 3)?;
            let name = args[0].str("matrix name")?;
            let row = args[1].int("row")?;
            let col = args[2].int("column")?;
            if set {
                let value = args[3].set_value()?;
                session.write_matrix(name, row, col, value)?;
                Ok(Reply::None)
            } else {
                Ok(session.read_matrix(name, row, col)?.into())
            }
        }
        "st_rows" => {
            arity(func, args, 1)?;
            Ok(Reply::Int(session.matrix_rows(args[0].str("matrix name")?) as i64))
        }
        "st_cols" => {
            arity(func, args, 1)?;
            Ok(Reply::Int(session.matrix_cols(args[0].str("matrix name")?) as i64))
        }
        "st_global" => {
            let set = get_or_set(func, args, 1)?;
            let name = args[0].str("macro name")?;
            if set {
                session.write_global(name, args[1].str("macro value")?)?;
                Ok(Reply::None)
            } else {
                Ok(Reply::Value(Value::Text(session.read_global(name)?)))
            }
        }
        "st_local" => {
            let set = get_or_set(func, args, 1)?;
            let name = args[0].str("local name")?;
            if set {
                session.write_local(name, args[1].str("local value")?)?;
                Ok(Reply::None)
            } else {
                Ok(Reply::Value(Value::Text(session.read_local(name)?)))
            }
        }
        "st_numscalar" => {
            let set = get_or_set(func, args, 1)?;
            let name = args[0].str("scalar name")?;
            if set {
                let value = args[1].set_value()?;
                session.write_scalar(name, value)?;
                Ok(Reply::None)
            } else {
                Ok(session.read_scalar(name)?.into())
            }
        }
        "st_varindex" => {
            if !(1..=2).contains(&args.len()) {
                return Err(BridgeError::type_mismatch(format!("{func}() takes 1 or 2 arguments")));
            }
            let abbreviate = args.get(1).is_some_and(Arg::truthy);
            let index = session.var_index(args[0].str("variable name")?, abbreviate)?;
            Ok(Reply::Int(index as i64))
        }
        "st_varname" => {
            arity(func, args, 1)?;
            let name = session.var_name(args[0].int("variable index")?)?;
            Ok(Reply::Value(Value::Text(name.to_owned())))
        }
        "st_isnumvar" => {
            arity(func, args, 1)?;
            Ok(Reply::Bool(session.is_numeric_var(args[0].var()?)?))
        }
        "st_isstrvar" => {
            arity(func, args, 1)?;
            Ok(Reply::Bool(session.is_text_var(args[0].var()?)?))
        }
        "st_ifobs" => {
            arity(func, args, 1)?;
            Ok(Reply::Bool(session.is_selected(args[0].int("observation")?)?))
        }
        "st_in1" => {
            arity(func, args, 0)?;
            Ok(Reply::Int(session.obs_range().start as i64))
        }
        "st_in2" => {
            arity(func, args, 0)?;
            Ok(Reply::Int(session.obs_range().end as i64))
        }
        "st_ismissing" => {
            arity(func, args, 1)?;
            Ok(Reply::Bool(is_missing_arg(&args[0])))
        }
        "st_format" => {
            arity(func, args, 2)?;
            let fmt = args[0].str("format")?;
            let value = match &args[1] {
                Arg::Str(_) => {
                    return Err(BridgeError::type_mismatch(
                        "2nd arg should be float, None, or a missing value",
                    ))
                }
                other => other.set_value()?,
            };
            Ok(Reply::Value(Value::Text(session.format_value(fmt, value)?)))
        }
        "_st_display" => {
            arity(func, args, 1)?;
            session.display(args[0].str("text")?);
            Ok(Reply::None)
        }
        "_st_error" => {
            arity(func, args, 1)?;
            session.display_error(args[0].str("text")?);
            Ok(Reply::None)
        }
        "st_isname" | "st_isvarname" | "st_islmname" | "st_isfmt" | "st_isnumfmt"
        | "st_isstrfmt" => {
            arity(func, args, 1)?;
            let text = args[0].str("function argument")?;
            let check: fn(&str) -> bool = match func {
                "st_isname" => names::is_name,
                "st_isvarname" => names::is_varname,
                "st_islmname" => names::is_lmname,
                "st_isfmt" => names::is_fmt,
                "st_isnumfmt" => names::is_numfmt,
                _ => names::is_strfmt,
            };
            Ok(Reply::Bool(check(text)))
        }
        _ => Err(BridgeError::NotFound(format!("no bridge function named {func}"))),
    }
}

fn is_missing_arg(arg: &Arg) -> bool {
    match arg {
        Arg::None | Arg::Missing(_) => true,
        Arg::Float(x) => missing::is_missing(*x),
        Arg::Int(_) | Arg::Bool(_) | Arg::Str(_) => false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
