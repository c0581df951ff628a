//! Row/variable selections over the dataset, and whole-matrix access.
//!
//! [`Session::view`] turns optional observation and variable lists plus a
//! [`Select`] rule into validated zero-based index lists.  The lists are
//! fixed when the view is built; later writes to the select variable do not
//! change which rows a [`View`] covers.

use log::debug;

use crate::accessor::VarRef;
use crate::bulk::check_shape;
use crate::error::{BridgeError, BridgeResult};
use crate::host::Host;
use crate::index::{host_index, translate, Axis};
use crate::session::Session;
use crate::value::{SetValue, Value};

/// Which observations of a view survive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Select {
    /// Every requested observation.
    #[default]
    All,
    /// Observations where this numeric variable is not zero.  Missing
    /// counts as non-zero.
    NonZero(VarRef),
    /// Observations where no numeric variable of the view is missing.
    CompleteCases,
}

/// Validated, zero-based observation and variable indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct View {
    pub obs: Vec<usize>,
    pub vars: Vec<usize>,
}

impl View {
    pub fn shape(&self) -> (usize, usize) {
        (self.obs.len(), self.vars.len())
    }
}

impl<H: Host> Session<H> {
    /// Build a view.  `None` for `obs` or `vars` means all of them.
    pub fn view(
        &self,
        obs: Option<&[i64]>,
        vars: Option<&[VarRef]>,
        select: Select,
    ) -> BridgeResult<View> {
        let nobs = self.observation_count();
        let rows = match obs {
            Some(obs) => obs
                .iter()
                .map(|&o| translate(o, nobs, Axis::Observation))
                .collect::<BridgeResult<Vec<_>>>()?,
            None => (0..nobs).collect(),
        };
        let vars = match vars {
            Some(vars) => self.resolve_variables(vars)?,
            None => (0..self.variable_count()).collect(),
        };

        let obs = match select {
            Select::All => rows,
            Select::NonZero(var) => {
                let v = self.resolve_variable(var)?;
                if self.host.is_text(host_index(v)) {
                    let name = self.catalog.name(v).unwrap_or("?");
                    return Err(BridgeError::type_mismatch(format!(
                        "select variable {name} must be numeric"
                    )));
                }
                let mut keep = Vec::with_capacity(rows.len());
                for o in rows {
                    if self.read_cell(o as i64, v as i64)? != Value::Number(0.0) {
                        keep.push(o);
                    }
                }
                keep
            }
            Select::CompleteCases => {
                let numeric: Vec<usize> = vars
                    .iter()
                    .copied()
                    .filter(|&v| !self.host.is_text(host_index(v)))
                    .collect();
                let mut keep = Vec::with_capacity(rows.len());
                'rows: for o in rows {
                    for &v in &numeric {
                        if self.read_cell(o as i64, v as i64)?.is_missing() {
                            continue 'rows;
                        }
                    }
                    keep.push(o);
                }
                keep
            }
        };
        debug!("view of {} obs x {} vars", obs.len(), vars.len());
        Ok(View { obs, vars })
    }

    /// Every cell of `view`, one row per observation.  Text variables come
    /// back as [`Value::Text`].
    pub fn view_data(&self, view: &View) -> BridgeResult<Vec<Vec<Value>>> {
        view.obs
            .iter()
            .map(|&o| {
                view.vars
                    .iter()
                    .map(|&v| {
                        if self.host.is_text(host_index(v)) {
                            self.read_text_cell(o as i64, v as i64).map(Value::Text)
                        } else {
                            self.read_cell(o as i64, v as i64)
                        }
                    })
                    .collect()
            })
            .collect()
    }

    // ── Whole matrices ────────────────────────────────────────────────────────

    /// All elements of matrix `name`, row by row.
    pub fn matrix(&self, name: &str) -> BridgeResult<Vec<Vec<Value>>> {
        let (nrows, ncols) = self.matrix_shape(name)?;
        (0..nrows)
            .map(|r| {
                (0..ncols)
                    .map(|c| self.read_matrix(name, r as i64, c as i64))
                    .collect()
            })
            .collect()
    }

    /// Overwrite every element of matrix `name`.  `values` must match the
    /// matrix's shape exactly; nothing is written otherwise.
    pub fn store_matrix(&mut self, name: &str, values: &[Vec<SetValue>]) -> BridgeResult<()> {
        let (nrows, ncols) = self.matrix_shape(name)?;
        check_shape(values, nrows, ncols)?;
        for (r, row) in values.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                self.write_matrix(name, r as i64, c as i64, value)?;
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
