//! Typed get/set operations over the host.
//!
//! Every accessor follows the same order: validate indices and names, check
//! the declared type of a cell, then make exactly one host call.  Nothing is
//! sent to the host until validation has passed.

use std::ops::Range;

use log::trace;

use crate::error::{BridgeError, BridgeResult};
use crate::host::Host;
use crate::index::{count_from_host, from_host, host_index, translate, Axis};
use crate::missing::{from_external, to_external};
use crate::session::Session;
use crate::value::{bound_text, SetValue, Value};

/// A variable given by position or by (possibly abbreviated) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarRef {
    Index(i64),
    Name(String),
}

impl From<i32> for VarRef {
    fn from(i: i32) -> Self {
        VarRef::Index(i64::from(i))
    }
}

impl From<i64> for VarRef {
    fn from(i: i64) -> Self {
        VarRef::Index(i)
    }
}

impl From<&str> for VarRef {
    fn from(s: &str) -> Self {
        VarRef::Name(s.to_owned())
    }
}

impl From<String> for VarRef {
    fn from(s: String) -> Self {
        VarRef::Name(s)
    }
}

impl From<&String> for VarRef {
    fn from(s: &String) -> Self {
        VarRef::Name(s.clone())
    }
}

fn require_name<'a>(what: &str, name: &'a str) -> BridgeResult<&'a str> {
    if name.is_empty() {
        Err(BridgeError::InvalidName(format!("{what} name cannot be empty")))
    } else {
        Ok(name)
    }
}

impl<H: Host> Session<H> {
    // ── Counts ────────────────────────────────────────────────────────────────

    pub fn observation_count(&self) -> usize {
        count_from_host(self.host.observation_count())
    }

    pub fn variable_count(&self) -> usize {
        self.catalog.len()
    }

    // ── Variables ─────────────────────────────────────────────────────────────

    /// Zero-based index of a variable.  Names may be abbreviated when the
    /// config allows it.
    pub fn resolve_variable(&self, var: impl Into<VarRef>) -> BridgeResult<usize> {
        match var.into() {
            VarRef::Index(i) => translate(i, self.variable_count(), Axis::Variable),
            VarRef::Name(name) => self.catalog.resolve(&name, self.config.abbreviate),
        }
    }

    pub fn var_index(&self, name: &str, allow_abbreviation: bool) -> BridgeResult<usize> {
        self.catalog.resolve(name, allow_abbreviation)
    }

    /// Name of the variable at `index`; negative indices count from the end.
    pub fn var_name(&self, index: i64) -> BridgeResult<&str> {
        let v = translate(index, self.variable_count(), Axis::Variable)?;
        self.catalog
            .name(v)
            .ok_or_else(|| BridgeError::InternalInconsistency(format!("catalog has no entry {v}")))
    }

    pub fn is_text_var(&self, var: impl Into<VarRef>) -> BridgeResult<bool> {
        let v = self.resolve_variable(var)?;
        Ok(self.host.is_text(host_index(v)))
    }

    pub fn is_numeric_var(&self, var: impl Into<VarRef>) -> BridgeResult<bool> {
        self.is_text_var(var).map(|text| !text)
    }

    // ── Cells ─────────────────────────────────────────────────────────────────

    /// Validate a cell address and the variable's declared type.
    fn cell(&self, obs: i64, var: VarRef, want_text: bool) -> BridgeResult<(usize, usize)> {
        let o = translate(obs, self.observation_count(), Axis::Observation)?;
        let v = self.resolve_variable(var)?;
        if self.host.is_text(host_index(v)) != want_text {
            let name = self.catalog.name(v).unwrap_or("?");
            return Err(BridgeError::type_mismatch(if want_text {
                format!("variable {name} is numeric; use a numeric accessor")
            } else {
                format!("variable {name} is text; use a text accessor")
            }));
        }
        Ok((o, v))
    }

    fn cell_address(&self, o: usize, v: usize) -> String {
        format!("obs {o}, var {}", self.catalog.name(v).unwrap_or("?"))
    }

    pub fn read_cell(&self, obs: i64, var: impl Into<VarRef>) -> BridgeResult<Value> {
        let (o, v) = self.cell(obs, var.into(), false)?;
        trace!("read numeric cell obs {o} var {v}");
        let raw = self
            .host
            .read_numeric(host_index(v), host_index(o))
            .map_err(|rc| BridgeError::host("read numeric cell", self.cell_address(o, v), rc))?;
        Ok(to_external(raw))
    }

    pub fn write_cell(
        &mut self,
        obs: i64,
        var: impl Into<VarRef>,
        value: impl Into<SetValue>,
    ) -> BridgeResult<()> {
        let (o, v) = self.cell(obs, var.into(), false)?;
        let raw = from_external(value.into());
        trace!("write numeric cell obs {o} var {v} = {raw}");
        if let Err(rc) = self.host.write_numeric(host_index(v), host_index(o), raw) {
            return Err(BridgeError::host("write numeric cell", self.cell_address(o, v), rc));
        }
        Ok(())
    }

    pub fn read_text_cell(&self, obs: i64, var: impl Into<VarRef>) -> BridgeResult<String> {
        let (o, v) = self.cell(obs, var.into(), true)?;
        trace!("read text cell obs {o} var {v}");
        let mut s = self
            .host
            .read_text(host_index(v), host_index(o))
            .map_err(|rc| BridgeError::host("read text cell", self.cell_address(o, v), rc))?;
        let keep = bound_text(&s, self.config.text_limit).len();
        s.truncate(keep);
        Ok(s)
    }

    pub fn write_text_cell(
        &mut self,
        obs: i64,
        var: impl Into<VarRef>,
        value: &str,
    ) -> BridgeResult<()> {
        let (o, v) = self.cell(obs, var.into(), true)?;
        let value = bound_text(value, self.config.text_limit);
        trace!("write text cell obs {o} var {v} ({} bytes)", value.len());
        if let Err(rc) = self.host.write_text(host_index(v), host_index(o), value) {
            return Err(BridgeError::host("write text cell", self.cell_address(o, v), rc));
        }
        Ok(())
    }

    // ── Matrices ──────────────────────────────────────────────────────────────

    pub fn matrix_rows(&self, name: &str) -> usize {
        count_from_host(self.host.matrix_rows(name))
    }

    pub fn matrix_cols(&self, name: &str) -> usize {
        count_from_host(self.host.matrix_cols(name))
    }

    /// Dimensions of an existing matrix.  A matrix with no rows or no
    /// columns does not exist as far as the host is concerned.
    pub(crate) fn matrix_shape(&self, name: &str) -> BridgeResult<(usize, usize)> {
        require_name("matrix", name)?;
        let (nrows, ncols) = (self.matrix_rows(name), self.matrix_cols(name));
        if nrows == 0 || ncols == 0 {
            return Err(BridgeError::NotFound(format!("matrix {name} not found")));
        }
        Ok((nrows, ncols))
    }

    fn element(&self, name: &str, row: i64, col: i64) -> BridgeResult<(usize, usize)> {
        let (nrows, ncols) = self.matrix_shape(name)?;
        let r = translate(row, nrows, Axis::MatrixRow)?;
        let c = translate(col, ncols, Axis::MatrixCol)?;
        Ok((r, c))
    }

    pub fn read_matrix(&self, name: &str, row: i64, col: i64) -> BridgeResult<Value> {
        let (r, c) = self.element(name, row, col)?;
        trace!("read matrix {name}[{r}, {c}]");
        let raw = self
            .host
            .read_matrix(name, host_index(r), host_index(c))
            .map_err(|rc| {
                BridgeError::host("read matrix element", format!("{name}[{r}, {c}]"), rc)
            })?;
        Ok(to_external(raw))
    }

    pub fn write_matrix(
        &mut self,
        name: &str,
        row: i64,
        col: i64,
        value: impl Into<SetValue>,
    ) -> BridgeResult<()> {
        let (r, c) = self.element(name, row, col)?;
        let raw = from_external(value.into());
        trace!("write matrix {name}[{r}, {c}] = {raw}");
        if let Err(rc) = self.host.write_matrix(name, host_index(r), host_index(c), raw) {
            return Err(BridgeError::host("write matrix element", format!("{name}[{r}, {c}]"), rc));
        }
        Ok(())
    }

    // ── Scalars and macros ────────────────────────────────────────────────────

    pub fn read_scalar(&self, name: &str) -> BridgeResult<Value> {
        require_name("scalar", name)?;
        let raw = self
            .host
            .read_scalar(name)
            .map_err(|rc| BridgeError::host("read scalar", name, rc))?;
        Ok(to_external(raw))
    }

    pub fn write_scalar(&mut self, name: &str, value: impl Into<SetValue>) -> BridgeResult<()> {
        require_name("scalar", name)?;
        let raw = from_external(value.into());
        self.host
            .write_scalar(name, raw)
            .map_err(|rc| BridgeError::host("write scalar", name, rc))
    }

    pub fn read_global(&self, name: &str) -> BridgeResult<String> {
        require_name("macro", name)?;
        self.read_macro(name)
    }

    pub fn write_global(&mut self, name: &str, value: &str) -> BridgeResult<()> {
        require_name("macro", name)?;
        self.write_macro(name, value)
    }

    /// Locals live in the host's macro table under [`BridgeConfig::local_macro`].
    ///
    /// [`BridgeConfig::local_macro`]: crate::config::BridgeConfig::local_macro
    pub fn read_local(&self, name: &str) -> BridgeResult<String> {
        require_name("local", name)?;
        let full = self.config.local_macro(name);
        self.read_macro(&full)
    }

    pub fn write_local(&mut self, name: &str, value: &str) -> BridgeResult<()> {
        require_name("local", name)?;
        let full = self.config.local_macro(name);
        self.write_macro(&full, value)
    }

    fn read_macro(&self, name: &str) -> BridgeResult<String> {
        self.host
            .read_macro(name, self.config.text_limit)
            .map_err(|rc| BridgeError::host("read macro", name, rc))
    }

    fn write_macro(&mut self, name: &str, value: &str) -> BridgeResult<()> {
        let value = bound_text(value, self.config.text_limit);
        self.host
            .write_macro(name, value)
            .map_err(|rc| BridgeError::host("write macro", name, rc))
    }

    // ── Selection ─────────────────────────────────────────────────────────────

    /// Whether observation `obs` passes the host's `if` condition.
    pub fn is_selected(&self, obs: i64) -> BridgeResult<bool> {
        let o = translate(obs, self.observation_count(), Axis::Observation)?;
        Ok(self.host.is_selected(host_index(o)))
    }

    /// The host's `in` range as zero-based, end-exclusive observations.
    pub fn obs_range(&self) -> Range<usize> {
        let (first, last) = self.host.obs_range();
        from_host(first)..count_from_host(last)
    }

    // ── Display ───────────────────────────────────────────────────────────────

    pub fn format_value(&self, fmt: &str, value: impl Into<SetValue>) -> BridgeResult<String> {
        if fmt.len() > self.config.text_limit {
            return Err(BridgeError::InvalidFormat(format!(
                "format is {} bytes; at most {} allowed",
                fmt.len(),
                self.config.text_limit
            )));
        }
        Ok(self.host.format_value(fmt, from_external(value.into())))
    }

    pub fn display(&mut self, text: &str) {
        self.host.display(text);
    }

    pub fn display_error(&mut self, text: &str) {
        self.host.display_error(text);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
