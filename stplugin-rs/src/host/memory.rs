//! In-memory reference host.
//!
//! [`MemoryHost`] keeps a small dataset, matrices, scalars and a macro table
//! in ordinary collections and implements [`Host`] over them.  It publishes
//! the variable-name catalog macros the same way the host-side wrapper does
//! before calling the plugin, so a [`crate::Session`] can be built on it
//! directly.
//!
//! Test helpers: [`MemoryHost::fail_on`] makes one kind of host call return a
//! status code, and [`MemoryHost::data_calls`] counts cell reads and writes.

use std::cell::Cell;
use std::collections::HashMap;

use super::{Host, HostStatus};
use crate::config::{DEFAULT_COUNT_MACRO, DEFAULT_NAME_MACRO_PREFIX};
use crate::missing::MissingValue;
use crate::value::bound_text;

/// Host status for a bad index or name.
pub const RC_BAD_ADDRESS: i32 = 198;
/// Host status for a type mismatch.
pub const RC_TYPE_MISMATCH: i32 = 109;
/// Host status for a reference to something that does not exist.
pub const RC_NOT_FOUND: i32 = 111;

// ── MacroTable ────────────────────────────────────────────────────────────────

/// String-valued macro table.  Local macros live here too, under their
/// prefixed names.
#[derive(Debug, Default, Clone)]
pub struct MacroTable {
    macros: HashMap<String, String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a macro.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.macros.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(String::as_str)
    }

    /// Remove a macro.  Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.macros.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.macros.iter()
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

// ── Dataset pieces ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Column {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

#[derive(Debug, Clone)]
struct Variable {
    name: String,
    column: Column,
}

#[derive(Debug, Clone)]
struct Matrix {
    rows: usize,
    cols: usize,
    /// Row-major.
    data: Vec<f64>,
}

/// Kinds of host call that [`MemoryHost::fail_on`] can sabotage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    ReadNumeric,
    WriteNumeric,
    ReadText,
    WriteText,
    ReadMatrix,
    WriteMatrix,
    ReadMacro,
    WriteMacro,
    ReadScalar,
    WriteScalar,
}

// ── MemoryHost ────────────────────────────────────────────────────────────────

/// A host whose whole state lives in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nobs: usize,
    vars: Vec<Variable>,
    matrices: HashMap<String, Matrix>,
    scalars: HashMap<String, f64>,
    /// Global and local macros, plus the published catalog.
    pub macros: MacroTable,
    selection: Option<Vec<bool>>,
    range: Option<(i32, i32)>,
    failures: HashMap<HostOp, i32>,
    data_calls: Cell<usize>,
    /// Lines passed to [`Host::display`].
    pub output: Vec<String>,
    /// Lines passed to [`Host::display_error`].
    pub errors: Vec<String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a numeric variable.
    pub fn with_numeric(mut self, name: &str, values: Vec<f64>) -> Self {
        self.push_variable(name, Column::Numeric(values));
        self
    }

    /// Append a text variable.
    pub fn with_text(mut self, name: &str, values: &[&str]) -> Self {
        let values = values.iter().map(|s| (*s).to_owned()).collect();
        self.push_variable(name, Column::Text(values));
        self
    }

    /// Define a matrix from row-major `data`; short data is padded with `.`.
    pub fn with_matrix(mut self, name: &str, rows: usize, cols: usize, mut data: Vec<f64>) -> Self {
        data.resize(rows * cols, MissingValue::GENERIC.raw());
        self.matrices.insert(name.to_owned(), Matrix { rows, cols, data });
        self
    }

    pub fn with_scalar(mut self, name: &str, value: f64) -> Self {
        self.scalars.insert(name.to_owned(), value);
        self
    }

    pub fn with_macro(mut self, name: &str, value: &str) -> Self {
        self.macros.set(name, value);
        self
    }

    /// Restrict the `if` selection; observation `i` (zero-based) is selected
    /// iff `mask[i]`.
    pub fn with_selection(mut self, mask: Vec<bool>) -> Self {
        self.selection = Some(mask);
        self
    }

    /// Set the one-based `in` range.
    pub fn with_obs_range(mut self, first: i32, last: i32) -> Self {
        self.range = Some((first, last));
        self
    }

    /// Make every subsequent `op` call fail with `rc`.
    pub fn fail_on(&mut self, op: HostOp, rc: i32) {
        self.failures.insert(op, rc);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Number of cell and matrix element reads/writes issued so far.
    pub fn data_calls(&self) -> usize {
        self.data_calls.get()
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.scalars.get(name).copied()
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|v| v.name.as_str())
    }

    fn push_variable(&mut self, name: &str, column: Column) {
        let len = match &column {
            Column::Numeric(v) => v.len(),
            Column::Text(v) => v.len(),
        };
        self.nobs = self.nobs.max(len);
        self.vars.push(Variable { name: name.to_owned(), column });
        for var in &mut self.vars {
            match &mut var.column {
                Column::Numeric(v) => v.resize(self.nobs, MissingValue::GENERIC.raw()),
                Column::Text(v) => v.resize(self.nobs, String::new()),
            }
        }
        self.publish_catalog();
    }

    /// Write `__pynallvars` and `__pyallvars<i>` for the current variables.
    pub fn publish_catalog(&mut self) {
        self.macros.set(DEFAULT_COUNT_MACRO, self.vars.len().to_string());
        for (i, var) in self.vars.iter().enumerate() {
            self.macros.set(format!("{DEFAULT_NAME_MACRO_PREFIX}{i}"), var.name.clone());
        }
    }

    fn check(&self, op: HostOp) -> Result<(), HostStatus> {
        match self.failures.get(&op) {
            Some(&rc) => Err(HostStatus(rc)),
            None => Ok(()),
        }
    }

    fn count_data_call(&self) {
        self.data_calls.set(self.data_calls.get() + 1);
    }

    fn cell(&self, var: i32, obs: i32) -> Result<(&Column, usize), HostStatus> {
        let v = one_based(var, self.vars.len())?;
        let o = one_based(obs, self.nobs)?;
        Ok((&self.vars[v].column, o))
    }

    fn cell_mut(&mut self, var: i32, obs: i32) -> Result<(&mut Column, usize), HostStatus> {
        let v = one_based(var, self.vars.len())?;
        let o = one_based(obs, self.nobs)?;
        Ok((&mut self.vars[v].column, o))
    }

    fn element(&self, name: &str, row: i32, col: i32) -> Result<usize, HostStatus> {
        let m = self.matrices.get(name).ok_or(HostStatus(RC_NOT_FOUND))?;
        let r = one_based(row, m.rows)?;
        let c = one_based(col, m.cols)?;
        Ok(r * m.cols + c)
    }
}

fn one_based(i: i32, n: usize) -> Result<usize, HostStatus> {
    if i >= 1 && (i as usize) <= n {
        Ok(i as usize - 1)
    } else {
        Err(HostStatus(RC_BAD_ADDRESS))
    }
}

impl Host for MemoryHost {
    fn observation_count(&self) -> i32 {
        self.nobs as i32
    }

    fn is_text(&self, var: i32) -> bool {
        one_based(var, self.vars.len())
            .map(|v| matches!(self.vars[v].column, Column::Text(_)))
            .unwrap_or(false)
    }

    fn read_numeric(&self, var: i32, obs: i32) -> Result<f64, HostStatus> {
        self.count_data_call();
        self.check(HostOp::ReadNumeric)?;
        match self.cell(var, obs)? {
            (Column::Numeric(v), o) => Ok(v[o]),
            (Column::Text(_), _) => Err(HostStatus(RC_TYPE_MISMATCH)),
        }
    }

    fn write_numeric(&mut self, var: i32, obs: i32, value: f64) -> Result<(), HostStatus> {
        self.count_data_call();
        self.check(HostOp::WriteNumeric)?;
        match self.cell_mut(var, obs)? {
            (Column::Numeric(v), o) => {
                v[o] = value;
                Ok(())
            }
            (Column::Text(_), _) => Err(HostStatus(RC_TYPE_MISMATCH)),
        }
    }

    fn read_text(&self, var: i32, obs: i32) -> Result<String, HostStatus> {
        self.count_data_call();
        self.check(HostOp::ReadText)?;
        match self.cell(var, obs)? {
            (Column::Text(v), o) => Ok(v[o].clone()),
            (Column::Numeric(_), _) => Err(HostStatus(RC_TYPE_MISMATCH)),
        }
    }

    fn write_text(&mut self, var: i32, obs: i32, value: &str) -> Result<(), HostStatus> {
        self.count_data_call();
        self.check(HostOp::WriteText)?;
        match self.cell_mut(var, obs)? {
            (Column::Text(v), o) => {
                v[o] = value.to_owned();
                Ok(())
            }
            (Column::Numeric(_), _) => Err(HostStatus(RC_TYPE_MISMATCH)),
        }
    }

    fn matrix_rows(&self, name: &str) -> i32 {
        self.matrices.get(name).map_or(0, |m| m.rows as i32)
    }

    fn matrix_cols(&self, name: &str) -> i32 {
        self.matrices.get(name).map_or(0, |m| m.cols as i32)
    }

    fn read_matrix(&self, name: &str, row: i32, col: i32) -> Result<f64, HostStatus> {
        self.count_data_call();
        self.check(HostOp::ReadMatrix)?;
        let at = self.element(name, row, col)?;
        Ok(self.matrices[name].data[at])
    }

    fn write_matrix(
        &mut self,
        name: &str,
        row: i32,
        col: i32,
        value: f64,
    ) -> Result<(), HostStatus> {
        self.count_data_call();
        self.check(HostOp::WriteMatrix)?;
        let at = self.element(name, row, col)?;
        if let Some(m) = self.matrices.get_mut(name) {
            m.data[at] = value;
        }
        Ok(())
    }

    fn read_macro(&self, name: &str, buf_len: usize) -> Result<String, HostStatus> {
        self.check(HostOp::ReadMacro)?;
        // An undefined macro reads as empty.
        let value = self.macros.get(name).unwrap_or("");
        Ok(bound_text(value, buf_len).to_owned())
    }

    fn write_macro(&mut self, name: &str, value: &str) -> Result<(), HostStatus> {
        self.check(HostOp::WriteMacro)?;
        if name.is_empty() {
            return Err(HostStatus(RC_BAD_ADDRESS));
        }
        self.macros.set(name, value);
        Ok(())
    }

    fn read_scalar(&self, name: &str) -> Result<f64, HostStatus> {
        self.check(HostOp::ReadScalar)?;
        self.scalars.get(name).copied().ok_or(HostStatus(RC_NOT_FOUND))
    }

    fn write_scalar(&mut self, name: &str, value: f64) -> Result<(), HostStatus> {
        self.check(HostOp::WriteScalar)?;
        if name.is_empty() {
            return Err(HostStatus(RC_BAD_ADDRESS));
        }
        self.scalars.insert(name.to_owned(), value);
        Ok(())
    }

    fn is_selected(&self, obs: i32) -> bool {
        let Ok(o) = one_based(obs, self.nobs) else { return false };
        self.selection
            .as_ref()
            .map_or(true, |mask| mask.get(o).copied().unwrap_or(false))
    }

    fn obs_range(&self) -> (i32, i32) {
        self.range.unwrap_or((1, self.nobs as i32))
    }

    fn display(&mut self, text: &str) {
        self.output.push(text.to_owned());
    }

    fn display_error(&mut self, text: &str) {
        self.errors.push(text.to_owned());
    }

    fn format_value(&self, fmt: &str, value: f64) -> String {
        format_number(fmt, value)
    }
}

/// A small subset of the host's numeric formats: `%[-]w.d{f,g,e}`.
/// Missing values print their name, right-aligned in the width.
fn format_number(fmt: &str, value: f64) -> String {
    let spec = fmt.trim().strip_prefix('%').unwrap_or(fmt);
    let (left, spec) = match spec.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, spec),
    };
    let kind = spec.chars().last().unwrap_or('g');
    let body = spec.get(..spec.len().saturating_sub(1)).unwrap_or("");
    let (width, prec) = body.split_once('.').unwrap_or((body, "0"));
    let width: usize = width.parse().unwrap_or(0);
    let prec: usize = prec.parse().unwrap_or(0);

    let text = match MissingValue::from_raw(value) {
        Some(mv) => mv.name(),
        None => match kind {
            'f' => format!("{value:.prec$}"),
            'e' => format!("{value:.prec$e}"),
            _ => format!("{value}"),
        },
    };
    if left {
        format!("{text:<width$}")
    } else {
        format!("{text:>width$}")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
