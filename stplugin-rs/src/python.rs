//! Optional Python bindings via the `pyo3` crate.
//!
//! Enabled with the `python` Cargo feature:
//! ```text
//! cargo build --features python
//! cargo test  --features python
//! ```
//!
//! # Python `stata_plugin` module
//!
//! Every function in [`crate::dispatch::FUNCTIONS`] is exposed under the same
//! name and takes the same loose argument list, for example
//! `stata_plugin.st_matrix_el("b", 0, 1)` or
//! `stata_plugin._st_store(0, "price", None)`.  The module also exports the
//! `MissingValue` class and the generic missing value as `MISSING`.
//!
//! Bridge errors surface as Python exceptions:
//!
//! | Error kind | Exception |
//! |------------|-----------|
//! | `OutOfRange` | `IndexError` |
//! | `TypeMismatch` | `TypeError` |
//! | `HostAccess`, `InternalInconsistency` | `RuntimeError` |
//! | anything else | `ValueError` |

#[cfg(feature = "python")]
pub use python_impl::{PluginEngine, PyMissingValue};

#[cfg(feature = "python")]
mod python_impl {
    use std::cell::RefCell;
    use std::path::Path;
    use std::sync::OnceLock;

    use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyTypeError, PyValueError};
    use pyo3::prelude::*;
    use pyo3::pyclass::CompareOp;
    use pyo3::types::{PyBool, PyFloat, PyInt, PyString, PyTuple};

    use crate::catalog::VariableCatalog;
    use crate::config::BridgeConfig;
    use crate::dispatch::{self, Arg, Reply};
    use crate::error::{BridgeError, ErrorKind};
    use crate::host::Host;
    use crate::missing::MissingValue;
    use crate::session::Session;
    use crate::value::Value;

    type ActiveSession = Session<Box<dyn Host>>;

    thread_local! {
        /// The invocation currently running Python code on this thread.
        static ACTIVE: RefCell<Option<ActiveSession>> = const { RefCell::new(None) };
    }

    static PYTHON_INIT: OnceLock<()> = OnceLock::new();

    fn to_py_err(e: BridgeError) -> PyErr {
        let msg = e.to_string();
        match e.kind() {
            ErrorKind::OutOfRange => PyIndexError::new_err(msg),
            ErrorKind::TypeMismatch => PyTypeError::new_err(msg),
            ErrorKind::HostAccess | ErrorKind::InternalInconsistency => {
                PyRuntimeError::new_err(msg)
            }
            _ => PyValueError::new_err(msg),
        }
    }

    // ── MissingValue class ────────────────────────────────────────────────

    /// `stata_plugin.MissingValue(index=0)`: one of `.`, `.a` … `.z`.
    #[pyclass(name = "MissingValue", module = "stata_plugin", frozen)]
    #[derive(Clone, Copy)]
    pub struct PyMissingValue(pub MissingValue);

    #[pymethods]
    impl PyMissingValue {
        #[new]
        #[pyo3(signature = (index = 0))]
        fn new(index: u8) -> PyResult<Self> {
            MissingValue::new(index)
                .map(PyMissingValue)
                .ok_or_else(|| PyValueError::new_err("missing value index must be in 0..=26"))
        }

        /// The double stored by the host.
        #[getter]
        fn value(&self) -> f64 {
            self.0.raw()
        }

        #[getter]
        fn index(&self) -> Option<u8> {
            self.0.code()
        }

        #[getter]
        fn name(&self) -> String {
            self.0.name()
        }

        fn __repr__(&self) -> String {
            self.0.name()
        }

        fn __str__(&self) -> String {
            self.0.name()
        }

        fn __hash__(&self) -> u64 {
            self.0.raw().to_bits()
        }

        /// Missing values order among themselves by code and sort above
        /// every number.
        fn __richcmp__(&self, other: &Bound<'_, PyAny>, op: CompareOp, py: Python<'_>) -> PyObject {
            let ord = if let Ok(other) = other.downcast::<PyMissingValue>() {
                self.0.cmp(&other.get().0)
            } else if other.is_instance_of::<PyInt>() || other.is_instance_of::<PyFloat>() {
                std::cmp::Ordering::Greater
            } else {
                return py.NotImplemented();
            };
            op.matches(ord).into_py(py)
        }
    }

    // ── Argument and reply conversion ─────────────────────────────────────

    fn to_arg(obj: &Bound<'_, PyAny>) -> PyResult<Arg> {
        if obj.is_none() {
            Ok(Arg::None)
        } else if let Ok(mv) = obj.downcast::<PyMissingValue>() {
            Ok(Arg::Missing(mv.get().0))
        } else if let Ok(b) = obj.downcast::<PyBool>() {
            Ok(Arg::Bool(b.is_true()))
        } else if obj.is_instance_of::<PyInt>() {
            // Ints too wide for i64 cross as doubles, where they may land in
            // the missing band.
            match obj.extract::<i64>() {
                Ok(i) => Ok(Arg::Int(i)),
                Err(_) => Ok(Arg::Float(obj.extract()?)),
            }
        } else if obj.is_instance_of::<PyFloat>() {
            Ok(Arg::Float(obj.extract()?))
        } else if let Ok(s) = obj.downcast::<PyString>() {
            Ok(Arg::Str(s.to_str()?.to_owned()))
        } else {
            Err(PyTypeError::new_err(format!(
                "unsupported argument type {}",
                obj.get_type().name()?
            )))
        }
    }

    fn to_py(py: Python<'_>, reply: Reply) -> PyResult<PyObject> {
        Ok(match reply {
            Reply::None => py.None(),
            Reply::Bool(b) => b.into_py(py),
            Reply::Int(i) => i.into_py(py),
            Reply::Value(Value::Number(x)) => x.into_py(py),
            Reply::Value(Value::Text(s)) => s.into_py(py),
            Reply::Value(Value::Missing(mv)) => Py::new(py, PyMissingValue(mv))?.into_py(py),
        })
    }

    fn route(py: Python<'_>, func: &str, args: &Bound<'_, PyTuple>) -> PyResult<PyObject> {
        let converted: PyResult<Vec<Arg>> = args.iter().map(|a| to_arg(&a)).collect();
        let args = match converted {
            Ok(args) => args,
            // Objects with no bridge shape are simply not missing.
            Err(_) if func == "st_ismissing" => return Ok(false.into_py(py)),
            Err(e) => return Err(e),
        };
        let reply = ACTIVE.with(|slot| {
            let mut slot = slot
                .try_borrow_mut()
                .map_err(|_| PyRuntimeError::new_err("bridge call re-entered"))?;
            let session = slot
                .as_mut()
                .ok_or_else(|| PyRuntimeError::new_err("no plugin invocation is active"))?;
            dispatch::call(session, func, &args).map_err(to_py_err)
        })?;
        to_py(py, reply)
    }

    // ── stata_plugin module registration ──────────────────────────────────

    macro_rules! bridge_functions {
        ($($name:ident),* $(,)?) => {
            $(
                #[pyfunction]
                #[pyo3(signature = (*args))]
                fn $name(py: Python<'_>, args: &Bound<'_, PyTuple>) -> PyResult<PyObject> {
                    route(py, stringify!($name), args)
                }
            )*

            fn add_bridge_functions(m: &Bound<'_, PyModule>) -> PyResult<()> {
                $( m.add_function(wrap_pyfunction!($name, m)?)?; )*
                Ok(())
            }
        };
    }

    bridge_functions!(
        st_nobs, st_nvar, _st_data, _st_store, _st_sdata, _st_sstore, st_matrix_el, st_rows,
        st_cols, st_global, st_local, st_numscalar, st_varindex, st_varname, st_isnumvar,
        st_isstrvar, st_ifobs, st_in1, st_in2, st_ismissing, st_format, _st_display, _st_error,
        st_isname, st_isvarname, st_islmname, st_isfmt, st_isnumfmt, st_isstrfmt,
    );

    fn register_module(py: Python<'_>) -> PyResult<()> {
        let m = PyModule::new_bound(py, "stata_plugin")?;
        add_bridge_functions(&m)?;
        m.add_class::<PyMissingValue>()?;
        m.add("MISSING", Py::new(py, PyMissingValue(MissingValue::GENERIC))?)?;
        let sys = py.import_bound("sys")?;
        sys.getattr("modules")?.set_item("stata_plugin", &m)?;
        Ok(())
    }

    /// Route `print` output and tracebacks to the host's display channels.
    const INIT_SRC: &str = "\
import sys, stata_plugin

class _HostStream:
    def __init__(self, output):
        self._output = output
    def write(self, s):
        self._output(s)
    def flush(self):
        pass

sys.stdout = _HostStream(stata_plugin._st_display)
sys.stderr = _HostStream(stata_plugin._st_error)
sys.argv = ['stata_plugin']
";

    // ── PluginEngine ──────────────────────────────────────────────────────

    /// The embedded interpreter with `stata_plugin` registered.
    ///
    /// Each [`PluginEngine::invoke`] is one plugin call: the session is
    /// installed for the duration of the Python code and removed afterwards,
    /// so `stata_plugin.*` functions fail outside an invocation.
    pub struct PluginEngine;

    impl PluginEngine {
        /// Initialise the interpreter (at most once per process) and register
        /// the module.
        pub fn new() -> PyResult<Self> {
            PYTHON_INIT.get_or_init(pyo3::prepare_freethreaded_python);
            Python::with_gil(|py| {
                register_module(py)?;
                py.run_bound(INIT_SRC, None, None)
            })?;
            Ok(Self)
        }

        /// Run `code` against `host` and hand the host back.
        ///
        /// A catalog failure is shown on the host's error channel and the
        /// code never runs.  A Python exception is printed (to the host's
        /// error channel, via `sys.stderr`) and returned.
        pub fn invoke(
            &self,
            mut host: Box<dyn Host>,
            config: BridgeConfig,
            code: &str,
        ) -> (Box<dyn Host>, PyResult<()>) {
            if ACTIVE.with(|slot| slot.borrow().is_some()) {
                let e = PyRuntimeError::new_err("a plugin invocation is already active");
                return (host, Err(e));
            }
            let catalog = match VariableCatalog::load(&host, &config) {
                Ok(catalog) => catalog,
                Err(e) => {
                    host.display_error(&format!("{e}\n"));
                    return (host, Err(to_py_err(e)));
                }
            };
            let session = Session::with_catalog(host, catalog, config);
            ACTIVE.with(|slot| *slot.borrow_mut() = Some(session));

            let result = Python::with_gil(|py| {
                let r = py.run_bound(code, None, None);
                if let Err(e) = &r {
                    e.print(py);
                }
                r
            });

            let session = ACTIVE
                .with(|slot| slot.borrow_mut().take())
                .expect("session stays installed until the invocation ends");
            (session.finish(), result)
        }

        /// Run a Python source file as one invocation.
        pub fn invoke_file(
            &self,
            host: Box<dyn Host>,
            config: BridgeConfig,
            path: &Path,
        ) -> (Box<dyn Host>, PyResult<()>) {
            match std::fs::read_to_string(path) {
                Ok(code) => self.invoke(host, config, &code),
                Err(e) => (host, Err(PyErr::new::<pyo3::exceptions::PyOSError, _>(e.to_string()))),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(all(test, feature = "python"))]
mod tests {
    use super::python_impl::*;
    use std::sync::Mutex;

    use pyo3::Python;

    use crate::config::BridgeConfig;
    use crate::host::memory::MemoryHost;
    use crate::host::Host;

    // The interpreter and its module table are process-wide.  Acquire this
    // mutex at the top of every test.
    static TEST_MX: Mutex<()> = Mutex::new(());

    fn auto() -> Box<dyn Host> {
        Box::new(
            MemoryHost::new()
                .with_text("make", &["AMC", "Buick"])
                .with_numeric("price", vec![4099.0, 4749.0])
                .with_matrix("b", 1, 2, vec![1.0, 2.0]),
        )
    }

    fn run(code: &str) -> (Box<dyn Host>, pyo3::PyResult<()>) {
        let engine = PluginEngine::new().unwrap();
        engine.invoke(auto(), BridgeConfig::default(), code)
    }

    fn global(host: &dyn Host, name: &str) -> String {
        host.read_macro(name, 244).unwrap()
    }

    #[test]
    fn counts_and_cells() {
        let _g = TEST_MX.lock().unwrap_or_else(|p| p.into_inner());
        let (host, r) = run(
            "import stata_plugin as sp\n\
             sp.st_global('n', str(sp.st_nobs()) + ' ' + str(sp.st_nvar()))\n\
             sp._st_store(0, 'pr', sp._st_data(1, 'price') + 1)\n",
        );
        r.unwrap();
        assert_eq!(global(&*host, "n"), "2 2");
        assert_eq!(host.read_numeric(2, 1).unwrap(), 4750.0);
    }

    #[test]
    fn missing_values_cross_as_objects() {
        let _g = TEST_MX.lock().unwrap_or_else(|p| p.into_inner());
        let (host, r) = run(
            "import stata_plugin as sp\n\
             sp._st_store(0, 1, sp.MissingValue(3))\n\
             v = sp._st_data(0, 1)\n\
             assert isinstance(v, sp.MissingValue) and v.name == '.c'\n\
             assert sp.st_ismissing(v) and sp.st_ismissing(None) and not sp.st_ismissing([])\n\
             assert sp.MISSING < v and v > 1e300\n\
             assert sp.st_ismissing(10**308) and not sp.st_ismissing(10**20)\n\
             sp._st_store(1, 1, None)\n",
        );
        r.unwrap();
        assert_eq!(host.read_numeric(2, 2).unwrap().to_bits(), 0x7FE0_0000_0000_0000);
    }

    #[test]
    fn errors_map_to_exceptions() {
        let _g = TEST_MX.lock().unwrap_or_else(|p| p.into_inner());
        let (host, r) = run(
            "import stata_plugin as sp\n\
             hits = []\n\
             try: sp._st_data(5, 0)\n\
             except IndexError: hits.append('index')\n\
             try: sp._st_data(0, 'make')\n\
             except TypeError: hits.append('type')\n\
             try: sp.st_matrix_el('b', 0)\n\
             except TypeError: hits.append('arity')\n\
             try: sp.st_matrix_el('nope', 0, 0)\n\
             except ValueError: hits.append('notfound')\n\
             sp.st_local('hits', ' '.join(hits))\n",
        );
        r.unwrap();
        assert_eq!(global(&*host, "_hits"), "index type arity notfound");
    }

    #[test]
    fn name_checks_are_exposed() {
        let _g = TEST_MX.lock().unwrap_or_else(|p| p.into_inner());
        let (host, r) = run(
            "import stata_plugin as sp\n\
             ok = sp.st_isvarname('price') and not sp.st_isvarname('in')\n\
             ok = ok and sp.st_isnumfmt('%9.2f') and sp.st_isstrfmt('%-20s')\n\
             sp.st_global('ok', str(ok))\n",
        );
        r.unwrap();
        assert_eq!(global(&*host, "ok"), "True");
    }

    #[test]
    fn python_exception_is_returned() {
        let _g = TEST_MX.lock().unwrap_or_else(|p| p.into_inner());
        let (_host, r) = run("raise ValueError('boom')");
        assert!(r.is_err());
    }

    #[test]
    fn catalog_failure_skips_code() {
        let _g = TEST_MX.lock().unwrap_or_else(|p| p.into_inner());
        let engine = PluginEngine::new().unwrap();
        let host: Box<dyn Host> = Box::new(MemoryHost::new().with_macro("__pynallvars", "many"));
        let code = "import stata_plugin as sp\nsp.st_global('ran', '1')";
        let (host, r) = engine.invoke(host, BridgeConfig::default(), code);
        assert!(r.is_err());
        assert_eq!(global(&*host, "ran"), "");
    }

    #[test]
    fn no_session_outside_invocation() {
        let _g = TEST_MX.lock().unwrap_or_else(|p| p.into_inner());
        let _engine = PluginEngine::new().unwrap();
        let code = "import stata_plugin\nstata_plugin.st_nobs()";
        let r = Python::with_gil(|py| py.run_bound(code, None, None));
        assert!(r.is_err());
    }

    #[test]
    fn invoke_file_runs_script() {
        let _g = TEST_MX.lock().unwrap_or_else(|p| p.into_inner());
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "import stata_plugin\nstata_plugin.st_global('from_file', 'yes')").unwrap();
        let engine = PluginEngine::new().unwrap();
        let (host, r) = engine.invoke_file(auto(), BridgeConfig::default(), f.path());
        r.unwrap();
        assert_eq!(global(&*host, "from_file"), "yes");
    }
}
