//! C function-table host.
//!
//! A host written in C hands the bridge a [`HostTable`] of callbacks.
//! [`ForeignHost`] wraps the table and implements [`Host`] over it, owning
//! the buffer and C string conversions.  All indices passed to the callbacks
//! are one-based.  Every callback returning `c_int` (other than counts and
//! flags) reports `0` for success and a host status code otherwise.

use std::ffi::{CStr, CString};

use libc::{c_char, c_double, c_int};

use super::{Host, HostStatus};
use crate::value::TEXT_LIMIT;

/// Status reported when a name or text cannot cross the C boundary
/// (interior NUL byte).
pub const RC_BAD_STRING: i32 = 198;

/// Callbacks exported by a C host.
///
/// Buffers passed to `sdata`, `macro_use` and `format` are `buf_len` bytes
/// long; the host writes a NUL-terminated string that fits.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HostTable {
    pub nobs: unsafe extern "C" fn() -> c_int,
    pub isstr: unsafe extern "C" fn(var: c_int) -> c_int,
    pub vdata: unsafe extern "C" fn(var: c_int, obs: c_int, out: *mut c_double) -> c_int,
    pub vstore: unsafe extern "C" fn(var: c_int, obs: c_int, value: c_double) -> c_int,
    pub sdata:
        unsafe extern "C" fn(var: c_int, obs: c_int, buf: *mut c_char, buf_len: c_int) -> c_int,
    pub sstore: unsafe extern "C" fn(var: c_int, obs: c_int, value: *const c_char) -> c_int,
    pub row: unsafe extern "C" fn(mat: *const c_char) -> c_int,
    pub col: unsafe extern "C" fn(mat: *const c_char) -> c_int,
    pub mat_el: unsafe extern "C" fn(
        mat: *const c_char,
        row: c_int,
        col: c_int,
        out: *mut c_double,
    ) -> c_int,
    pub mat_store: unsafe extern "C" fn(
        mat: *const c_char,
        row: c_int,
        col: c_int,
        value: c_double,
    ) -> c_int,
    pub macro_use:
        unsafe extern "C" fn(name: *const c_char, buf: *mut c_char, buf_len: c_int) -> c_int,
    pub macro_save: unsafe extern "C" fn(name: *const c_char, value: *const c_char) -> c_int,
    pub scal_use: unsafe extern "C" fn(name: *const c_char, out: *mut c_double) -> c_int,
    pub scal_save: unsafe extern "C" fn(name: *const c_char, value: c_double) -> c_int,
    pub ifobs: unsafe extern "C" fn(obs: c_int) -> c_int,
    pub in1: unsafe extern "C" fn() -> c_int,
    pub in2: unsafe extern "C" fn() -> c_int,
    pub display: unsafe extern "C" fn(text: *const c_char),
    pub error: unsafe extern "C" fn(text: *const c_char),
    pub format: unsafe extern "C" fn(
        buf: *mut c_char,
        buf_len: c_int,
        fmt: *const c_char,
        value: c_double,
    ) -> c_int,
}

/// [`Host`] over a C callback table.
pub struct ForeignHost {
    table: HostTable,
}

impl ForeignHost {
    /// # Safety
    ///
    /// Every callback in `table` must be safe to call with the arguments
    /// described on [`HostTable`] for as long as the `ForeignHost` lives.
    pub unsafe fn new(table: HostTable) -> Self {
        Self { table }
    }
}

fn c_string(s: &str) -> Result<CString, HostStatus> {
    CString::new(s).map_err(|_| HostStatus(RC_BAD_STRING))
}

/// C string for display output; interior NULs are dropped.
fn display_string(s: &str) -> CString {
    let bytes: Vec<u8> = s.bytes().filter(|&b| b != 0).collect();
    CString::new(bytes).unwrap_or_default()
}

/// Call `fill` with a zeroed buffer of `len + 1` bytes and read back the
/// NUL-terminated result.
fn read_buffer(
    len: usize,
    fill: impl FnOnce(*mut c_char, c_int) -> c_int,
) -> Result<String, HostStatus> {
    let mut buf = vec![0 as c_char; len + 1];
    let rc = fill(buf.as_mut_ptr(), c_int::try_from(buf.len()).unwrap_or(c_int::MAX));
    HostStatus::check(rc)?;
    if let Some(last) = buf.last_mut() {
        *last = 0;
    }
    // SAFETY: the buffer is NUL-terminated by the write above.
    let s = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Ok(s.to_string_lossy().into_owned())
}

impl Host for ForeignHost {
    fn observation_count(&self) -> i32 {
        unsafe { (self.table.nobs)() }
    }

    fn is_text(&self, var: i32) -> bool {
        unsafe { (self.table.isstr)(var) != 0 }
    }

    fn read_numeric(&self, var: i32, obs: i32) -> Result<f64, HostStatus> {
        let mut out: c_double = 0.0;
        HostStatus::check(unsafe { (self.table.vdata)(var, obs, &mut out) })?;
        Ok(out)
    }

    fn write_numeric(&mut self, var: i32, obs: i32, value: f64) -> Result<(), HostStatus> {
        HostStatus::check(unsafe { (self.table.vstore)(var, obs, value) })
    }

    fn read_text(&self, var: i32, obs: i32) -> Result<String, HostStatus> {
        read_buffer(TEXT_LIMIT, |buf, len| unsafe { (self.table.sdata)(var, obs, buf, len) })
    }

    fn write_text(&mut self, var: i32, obs: i32, value: &str) -> Result<(), HostStatus> {
        let value = c_string(value)?;
        HostStatus::check(unsafe { (self.table.sstore)(var, obs, value.as_ptr()) })
    }

    fn matrix_rows(&self, name: &str) -> i32 {
        match c_string(name) {
            Ok(name) => unsafe { (self.table.row)(name.as_ptr()) },
            Err(_) => 0,
        }
    }

    fn matrix_cols(&self, name: &str) -> i32 {
        match c_string(name) {
            Ok(name) => unsafe { (self.table.col)(name.as_ptr()) },
            Err(_) => 0,
        }
    }

    fn read_matrix(&self, name: &str, row: i32, col: i32) -> Result<f64, HostStatus> {
        let name = c_string(name)?;
        let mut out: c_double = 0.0;
        HostStatus::check(unsafe { (self.table.mat_el)(name.as_ptr(), row, col, &mut out) })?;
        Ok(out)
    }

    fn write_matrix(
        &mut self,
        name: &str,
        row: i32,
        col: i32,
        value: f64,
    ) -> Result<(), HostStatus> {
        let name = c_string(name)?;
        HostStatus::check(unsafe { (self.table.mat_store)(name.as_ptr(), row, col, value) })
    }

    fn read_macro(&self, name: &str, buf_len: usize) -> Result<String, HostStatus> {
        let name = c_string(name)?;
        read_buffer(buf_len, |buf, len| unsafe { (self.table.macro_use)(name.as_ptr(), buf, len) })
    }

    fn write_macro(&mut self, name: &str, value: &str) -> Result<(), HostStatus> {
        let name = c_string(name)?;
        let value = c_string(value)?;
        HostStatus::check(unsafe { (self.table.macro_save)(name.as_ptr(), value.as_ptr()) })
    }

    fn read_scalar(&self, name: &str) -> Result<f64, HostStatus> {
        let name = c_string(name)?;
        let mut out: c_double = 0.0;
        HostStatus::check(unsafe { (self.table.scal_use)(name.as_ptr(), &mut out) })?;
        Ok(out)
    }

    fn write_scalar(&mut self, name: &str, value: f64) -> Result<(), HostStatus> {
        let name = c_string(name)?;
        HostStatus::check(unsafe { (self.table.scal_save)(name.as_ptr(), value) })
    }

    fn is_selected(&self, obs: i32) -> bool {
        unsafe { (self.table.ifobs)(obs) != 0 }
    }

    fn obs_range(&self) -> (i32, i32) {
        unsafe { ((self.table.in1)(), (self.table.in2)()) }
    }

    fn display(&mut self, text: &str) {
        let text = display_string(text);
        unsafe { (self.table.display)(text.as_ptr()) }
    }

    fn display_error(&mut self, text: &str) {
        let text = display_string(text);
        unsafe { (self.table.error)(text.as_ptr()) }
    }

    fn format_value(&self, fmt: &str, value: f64) -> String {
        let Ok(fmt) = c_string(fmt) else {
            return String::new();
        };
        read_buffer(TEXT_LIMIT, |buf, len| unsafe {
            (self.table.format)(buf, len, fmt.as_ptr(), value)
        })
        .unwrap_or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    //! A fake C host: one numeric variable, one text variable, two
    //! observations, a 1×2 matrix, and a macro table, kept in thread-local
    //! state behind `extern "C"` functions.

    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use crate::config::BridgeConfig;
    use crate::session::Session;
    use crate::value::Value;

    #[derive(Default)]
    struct Fake {
        nums: [f64; 2],
        texts: [String; 2],
        mat: [f64; 2],
        macros: HashMap<String, String>,
        scalars: HashMap<String, f64>,
        shown: Vec<String>,
        errors: Vec<String>,
    }

    thread_local! {
        static FAKE: RefCell<Fake> = RefCell::new(Fake::default());
    }

    unsafe fn text(p: *const c_char) -> String {
        CStr::from_ptr(p).to_string_lossy().into_owned()
    }

    unsafe fn copy_out(s: &str, buf: *mut c_char, buf_len: c_int) {
        let n = s.len().min(buf_len as usize - 1);
        std::ptr::copy_nonoverlapping(s.as_ptr() as *const c_char, buf, n);
        *buf.add(n) = 0;
    }

    fn obs_ok(obs: c_int) -> bool {
        obs == 1 || obs == 2
    }

    unsafe extern "C" fn nobs() -> c_int {
        2
    }
    unsafe extern "C" fn isstr(var: c_int) -> c_int {
        (var == 2) as c_int
    }
    unsafe extern "C" fn vdata(var: c_int, obs: c_int, out: *mut c_double) -> c_int {
        if var != 1 || !obs_ok(obs) {
            return 198;
        }
        *out = FAKE.with(|f| f.borrow().nums[obs as usize - 1]);
        0
    }
    unsafe extern "C" fn vstore(var: c_int, obs: c_int, value: c_double) -> c_int {
        if var != 1 || !obs_ok(obs) {
            return 198;
        }
        FAKE.with(|f| f.borrow_mut().nums[obs as usize - 1] = value);
        0
    }
    unsafe extern "C" fn sdata(var: c_int, obs: c_int, buf: *mut c_char, len: c_int) -> c_int {
        if var != 2 || !obs_ok(obs) {
            return 198;
        }
        let s = FAKE.with(|f| f.borrow().texts[obs as usize - 1].clone());
        copy_out(&s, buf, len);
        0
    }
    unsafe extern "C" fn sstore(var: c_int, obs: c_int, value: *const c_char) -> c_int {
        if var != 2 || !obs_ok(obs) {
            return 198;
        }
        let s = text(value);
        FAKE.with(|f| f.borrow_mut().texts[obs as usize - 1] = s);
        0
    }
    unsafe extern "C" fn row(mat: *const c_char) -> c_int {
        (text(mat) == "m") as c_int
    }
    unsafe extern "C" fn col(mat: *const c_char) -> c_int {
        if text(mat) == "m" { 2 } else { 0 }
    }
    unsafe extern "C" fn mat_el(_: *const c_char, r: c_int, c: c_int, out: *mut c_double) -> c_int {
        if r != 1 || !(1..=2).contains(&c) {
            return 503;
        }
        *out = FAKE.with(|f| f.borrow().mat[c as usize - 1]);
        0
    }
    unsafe extern "C" fn mat_store(_: *const c_char, r: c_int, c: c_int, value: c_double) -> c_int {
        if r != 1 || !(1..=2).contains(&c) {
            return 503;
        }
        FAKE.with(|f| f.borrow_mut().mat[c as usize - 1] = value);
        0
    }
    unsafe extern "C" fn macro_use(name: *const c_char, buf: *mut c_char, len: c_int) -> c_int {
        let name = text(name);
        let v = FAKE.with(|f| f.borrow().macros.get(&name).cloned().unwrap_or_default());
        copy_out(&v, buf, len);
        0
    }
    unsafe extern "C" fn macro_save(name: *const c_char, value: *const c_char) -> c_int {
        let (name, value) = (text(name), text(value));
        FAKE.with(|f| f.borrow_mut().macros.insert(name, value));
        0
    }
    unsafe extern "C" fn scal_use(name: *const c_char, out: *mut c_double) -> c_int {
        let name = text(name);
        match FAKE.with(|f| f.borrow().scalars.get(&name).copied()) {
            Some(v) => {
                *out = v;
                0
            }
            None => 111,
        }
    }
    unsafe extern "C" fn scal_save(name: *const c_char, value: c_double) -> c_int {
        let name = text(name);
        FAKE.with(|f| f.borrow_mut().scalars.insert(name, value));
        0
    }
    unsafe extern "C" fn ifobs(obs: c_int) -> c_int {
        (obs == 2) as c_int
    }
    unsafe extern "C" fn in1() -> c_int {
        1
    }
    unsafe extern "C" fn in2() -> c_int {
        2
    }
    unsafe extern "C" fn display(t: *const c_char) {
        let t = text(t);
        FAKE.with(|f| f.borrow_mut().shown.push(t));
    }
    unsafe extern "C" fn error(t: *const c_char) {
        let t = text(t);
        FAKE.with(|f| f.borrow_mut().errors.push(t));
    }
    unsafe extern "C" fn format(
        buf: *mut c_char,
        len: c_int,
        fmt: *const c_char,
        value: c_double,
    ) -> c_int {
        let s = format!("{}:{value}", text(fmt));
        copy_out(&s, buf, len);
        0
    }

    fn table() -> HostTable {
        HostTable {
            nobs,
            isstr,
            vdata,
            vstore,
            sdata,
            sstore,
            row,
            col,
            mat_el,
            mat_store,
            macro_use,
            macro_save,
            scal_use,
            scal_save,
            ifobs,
            in1,
            in2,
            display,
            error,
            format,
        }
    }

    fn reset() {
        FAKE.with(|f| {
            let mut f = f.borrow_mut();
            *f = Fake::default();
            f.nums = [1.5, 2.5];
            f.texts = ["a".into(), "b".into()];
            f.mat = [10.0, 20.0];
            f.macros.insert("__pynallvars".into(), "2".into());
            f.macros.insert("__pyallvars0".into(), "weight".into());
            f.macros.insert("__pyallvars1".into(), "make".into());
        });
    }

    fn host() -> ForeignHost {
        reset();
        unsafe { ForeignHost::new(table()) }
    }

    #[test]
    fn cells_through_callbacks() {
        let mut s = Session::begin(host(), BridgeConfig::default()).unwrap();
        assert_eq!(s.variable_count(), 2);
        assert_eq!(s.read_cell(-1, "w").unwrap(), Value::Number(2.5));
        s.write_cell(0, "weight", 9.0).unwrap();
        assert_eq!(s.read_cell(0, 0).unwrap(), Value::Number(9.0));
        s.write_text_cell(1, "make", "Ford").unwrap();
        assert_eq!(s.read_text_cell(1, "make").unwrap(), "Ford");
        assert_eq!(s.read_text_cell(0, 1).unwrap(), "a");
    }

    #[test]
    fn matrices_scalars_macros() {
        let mut s = Session::begin(host(), BridgeConfig::default()).unwrap();
        assert_eq!(s.matrix_cols("m"), 2);
        assert_eq!(s.read_matrix("m", 0, -1).unwrap(), Value::Number(20.0));
        s.write_matrix("m", 0, 0, 5.0).unwrap();
        assert_eq!(s.read_matrix("m", 0, 0).unwrap(), Value::Number(5.0));
        assert!(s.read_matrix("other", 0, 0).is_err());

        s.write_scalar("k", 4.0).unwrap();
        assert_eq!(s.read_scalar("k").unwrap(), Value::Number(4.0));
        assert!(s.read_scalar("nope").is_err());

        s.write_local("tmp", "xyz").unwrap();
        assert_eq!(s.read_local("tmp").unwrap(), "xyz");
        assert_eq!(FAKE.with(|f| f.borrow().macros.get("_tmp").cloned()), Some("xyz".into()));
    }

    #[test]
    fn long_macro_is_cut_to_buffer() {
        let mut s = Session::begin(host(), BridgeConfig::default()).unwrap();
        s.write_global("long", &"q".repeat(400)).unwrap();
        assert_eq!(s.read_global("long").unwrap().len(), TEXT_LIMIT);
    }

    #[test]
    fn selection_display_format() {
        let mut s = Session::begin(host(), BridgeConfig::default()).unwrap();
        assert!(!s.is_selected(0).unwrap());
        assert!(s.is_selected(1).unwrap());
        assert_eq!(s.obs_range(), 0..2);
        s.display("hi\0there");
        s.display_error("bad");
        assert_eq!(s.format_value("%4.1f", 2.0).unwrap(), "%4.1f:2");
        FAKE.with(|f| {
            let f = f.borrow();
            assert_eq!(f.shown, ["hithere"]);
            assert_eq!(f.errors, ["bad"]);
        });
    }

    #[test]
    fn interior_nul_never_reaches_host() {
        let mut s = Session::begin(host(), BridgeConfig::default()).unwrap();
        let e = s.write_global("a\0b", "x").unwrap_err();
        assert!(e.to_string().contains("r(198)"), "{e}");
    }
}
