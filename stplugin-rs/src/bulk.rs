//! Rectangular reads and writes over several observations and variables.
//!
//! A variable given by name may hold several whitespace-separated names or
//! abbreviations (`"price mpg wei"`).  Every observation and variable is
//! validated, and every variable type-checked, before the first cell is
//! touched, so a bad address never leaves a half-written block behind.

use crate::accessor::VarRef;
use crate::error::{BridgeError, BridgeResult};
use crate::host::Host;
use crate::index::{host_index, translate, Axis};
use crate::session::Session;
use crate::value::{SetValue, Value};

impl<H: Host> Session<H> {
    /// Resolve a variable list, splitting names on whitespace.
    pub fn resolve_variables(&self, vars: &[VarRef]) -> BridgeResult<Vec<usize>> {
        let mut out = Vec::with_capacity(vars.len());
        for var in vars {
            match var {
                VarRef::Index(i) => out.push(translate(*i, self.variable_count(), Axis::Variable)?),
                VarRef::Name(names) => {
                    let before = out.len();
                    for name in names.split_whitespace() {
                        out.push(self.catalog.resolve(name, self.config.abbreviate)?);
                    }
                    if out.len() == before {
                        return Err(BridgeError::InvalidName(
                            "variable name cannot be empty".into(),
                        ));
                    }
                }
            }
        }
        Ok(out)
    }

    fn block(
        &self,
        obs: &[i64],
        vars: &[VarRef],
        want_text: bool,
    ) -> BridgeResult<(Vec<usize>, Vec<usize>)> {
        let nobs = self.observation_count();
        let obs = obs
            .iter()
            .map(|&o| translate(o, nobs, Axis::Observation))
            .collect::<BridgeResult<Vec<_>>>()?;
        let vars = self.resolve_variables(vars)?;
        if let Some(&v) = vars.iter().find(|&&v| self.host.is_text(host_index(v)) != want_text) {
            let name = self.catalog.name(v).unwrap_or("?");
            return Err(BridgeError::type_mismatch(if want_text {
                format!("only text variables allowed; {name} is numeric")
            } else {
                format!("only numeric variables allowed; {name} is text")
            }));
        }
        Ok((obs, vars))
    }

    /// Numeric block, one row per observation.
    pub fn data(&self, obs: &[i64], vars: &[VarRef]) -> BridgeResult<Vec<Vec<Value>>> {
        let (obs, vars) = self.block(obs, vars, false)?;
        obs.iter()
            .map(|&o| {
                vars.iter()
                    .map(|&v| self.read_cell(o as i64, VarRef::Index(v as i64)))
                    .collect()
            })
            .collect()
    }

    /// Text block, one row per observation.
    pub fn sdata(&self, obs: &[i64], vars: &[VarRef]) -> BridgeResult<Vec<Vec<String>>> {
        let (obs, vars) = self.block(obs, vars, true)?;
        obs.iter()
            .map(|&o| {
                vars.iter()
                    .map(|&v| self.read_text_cell(o as i64, VarRef::Index(v as i64)))
                    .collect()
            })
            .collect()
    }

    pub fn store(
        &mut self,
        obs: &[i64],
        vars: &[VarRef],
        values: &[Vec<SetValue>],
    ) -> BridgeResult<()> {
        let (obs, vars) = self.block(obs, vars, false)?;
        check_shape(values, obs.len(), vars.len())?;
        for (&o, row) in obs.iter().zip(values) {
            for (&v, &value) in vars.iter().zip(row) {
                self.write_cell(o as i64, VarRef::Index(v as i64), value)?;
            }
        }
        Ok(())
    }

    pub fn sstore<S: AsRef<str>>(
        &mut self,
        obs: &[i64],
        vars: &[VarRef],
        values: &[Vec<S>],
    ) -> BridgeResult<()> {
        let (obs, vars) = self.block(obs, vars, true)?;
        check_shape(values, obs.len(), vars.len())?;
        for (&o, row) in obs.iter().zip(values) {
            for (&v, value) in vars.iter().zip(row) {
                self.write_text_cell(o as i64, VarRef::Index(v as i64), value.as_ref())?;
            }
        }
        Ok(())
    }
}

pub(crate) fn check_shape<T>(values: &[Vec<T>], nobs: usize, nvars: usize) -> BridgeResult<()> {
    if values.len() != nobs || values.iter().any(|row| row.len() != nvars) {
        return Err(BridgeError::DimensionMismatch(format!(
            "values must be {nobs} rows of {nvars}"
        )));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::error::ErrorKind;
    use crate::host::memory::MemoryHost;

    fn host() -> MemoryHost {
        MemoryHost::new()
            .with_text("make", &["AMC", "Buick", "Cad."])
            .with_numeric("price", vec![4099.0, 4749.0, 3799.0])
            .with_numeric("mpg", vec![22.0, 17.0, 22.0])
            .with_numeric("weight", vec![2930.0, 3350.0, 2640.0])
    }

    fn vars(names: &[&str]) -> Vec<VarRef> {
        names.iter().map(|&n| VarRef::from(n)).collect()
    }

    #[test]
    fn names_split_on_whitespace() {
        let mut h = host();
        let s = Session::begin(&mut h, BridgeConfig::default()).unwrap();
        let got = s.resolve_variables(&[VarRef::from("price  we"), VarRef::Index(-2)]).unwrap();
        assert_eq!(got, [1, 3, 2]);
        assert_eq!(
            s.resolve_variables(&vars(&["  "])).unwrap_err().kind(),
            ErrorKind::InvalidName
        );
    }

    #[test]
    fn numeric_block() {
        let mut h = host();
        let s = Session::begin(&mut h, BridgeConfig::default()).unwrap();
        let rows = s.data(&[0, -1], &vars(&["price mpg"])).unwrap();
        assert_eq!(
            rows,
            [
                vec![Value::Number(4099.0), Value::Number(22.0)],
                vec![Value::Number(3799.0), Value::Number(22.0)],
            ]
        );
    }

    #[test]
    fn text_block() {
        let mut h = host();
        let mut s = Session::begin(&mut h, BridgeConfig::default()).unwrap();
        s.sstore(&[1, 2], &vars(&["make"]), &[vec!["Ford"], vec!["Dodge"]]).unwrap();
        assert_eq!(
            s.sdata(&[0, 1, 2], &[VarRef::Index(0)]).unwrap(),
            [["AMC"], ["Ford"], ["Dodge"]]
        );
    }

    #[test]
    fn mixed_types_rejected_before_any_call() {
        let mut h = host();
        {
            let mut s = Session::begin(&mut h, BridgeConfig::default()).unwrap();
            let e = s.data(&[0], &vars(&["price make"])).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::TypeMismatch);
            let e = s
                .store(&[0], &vars(&["price make"]), &[vec![SetValue::Absent, SetValue::Absent]])
                .unwrap_err();
            assert_eq!(e.kind(), ErrorKind::TypeMismatch);
        }
        assert_eq!(h.data_calls(), 0);
    }

    #[test]
    fn store_validates_everything_first() {
        let mut h = host();
        {
            let mut s = Session::begin(&mut h, BridgeConfig::default()).unwrap();
            let grid = [vec![SetValue::Number(1.0)], vec![SetValue::Number(2.0)]];
            let e = s.store(&[0, 7], &vars(&["price"]), &grid).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::OutOfRange);
            let e = s
                .store(&[0, 1], &vars(&["price mpg"]), &[vec![SetValue::Number(1.0)]])
                .unwrap_err();
            assert_eq!(e.kind(), ErrorKind::DimensionMismatch);
        }
        assert_eq!(h.data_calls(), 0);
    }

    #[test]
    fn store_writes_grid() {
        let mut h = host();
        let mut s = Session::begin(&mut h, BridgeConfig::default()).unwrap();
        let grid = vec![
            vec![SetValue::Number(1.0), SetValue::Absent],
            vec![SetValue::Number(3.0), SetValue::Number(4.0)],
        ];
        s.store(&[0, 2], &vars(&["mpg", "weight"]), &grid).unwrap();
        assert_eq!(s.read_cell(2, "weight").unwrap(), Value::Number(4.0));
        assert!(s.read_cell(0, "weight").unwrap().is_missing());
        assert_eq!(s.read_cell(1, "mpg").unwrap(), Value::Number(17.0));
    }
}
