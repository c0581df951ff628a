//! The host collaborator contract.
//!
//! Everything the bridge knows about the host's storage goes through
//! [`Host`].  All indices at this boundary are **one-based**; the bridge
//! converts script indices with [`crate::index::host_index`] right before a
//! call.  Calls that can fail return the host's non-zero status as
//! [`HostStatus`].
//!
//! | Method | Host concern |
//! |--------|--------------|
//! | [`Host::observation_count`] | dataset size |
//! | [`Host::is_text`] | declared variable type |
//! | [`Host::read_numeric`] / [`Host::write_numeric`] | numeric cells |
//! | [`Host::read_text`] / [`Host::write_text`] | text cells |
//! | [`Host::matrix_rows`] / [`Host::matrix_cols`] | matrix dimensions (0 = no such matrix) |
//! | [`Host::read_matrix`] / [`Host::write_matrix`] | matrix elements |
//! | [`Host::read_macro`] / [`Host::write_macro`] | global and local macros |
//! | [`Host::read_scalar`] / [`Host::write_scalar`] | named scalars |
//! | [`Host::is_selected`] / [`Host::obs_range`] | `if` / `in` restrictions |
//! | [`Host::display`] / [`Host::display_error`] | results window |
//! | [`Host::format_value`] | numeric display formats |

pub mod ffi;
pub mod memory;

pub use crate::error::HostStatus;

/// Synchronous access to the host's data store.
pub trait Host {
    fn observation_count(&self) -> i32;
    fn is_text(&self, var: i32) -> bool;

    fn read_numeric(&self, var: i32, obs: i32) -> Result<f64, HostStatus>;
    fn write_numeric(&mut self, var: i32, obs: i32, value: f64) -> Result<(), HostStatus>;
    fn read_text(&self, var: i32, obs: i32) -> Result<String, HostStatus>;
    fn write_text(&mut self, var: i32, obs: i32, value: &str) -> Result<(), HostStatus>;

    fn matrix_rows(&self, name: &str) -> i32;
    fn matrix_cols(&self, name: &str) -> i32;
    fn read_matrix(&self, name: &str, row: i32, col: i32) -> Result<f64, HostStatus>;
    fn write_matrix(
        &mut self,
        name: &str,
        row: i32,
        col: i32,
        value: f64,
    ) -> Result<(), HostStatus>;

    /// Read a macro into a buffer of `buf_len` bytes; longer contents are cut.
    fn read_macro(&self, name: &str, buf_len: usize) -> Result<String, HostStatus>;
    fn write_macro(&mut self, name: &str, value: &str) -> Result<(), HostStatus>;

    fn read_scalar(&self, name: &str) -> Result<f64, HostStatus>;
    fn write_scalar(&mut self, name: &str, value: f64) -> Result<(), HostStatus>;

    fn is_selected(&self, obs: i32) -> bool;
    /// One-based `(first, last)` observation of the `in` range the plugin was
    /// called with; the whole dataset when none was given.
    fn obs_range(&self) -> (i32, i32);

    fn display(&mut self, text: &str);
    fn display_error(&mut self, text: &str);
    fn format_value(&self, fmt: &str, value: f64) -> String;
}

/// Forwards every [`Host`] method through a pointer-like wrapper.
macro_rules! forward_host {
    ($($ty:ty),*) => {$(
        impl<H: Host + ?Sized> Host for $ty {
            fn observation_count(&self) -> i32 {
                (**self).observation_count()
            }

            fn is_text(&self, var: i32) -> bool {
                (**self).is_text(var)
            }

            fn read_numeric(&self, var: i32, obs: i32) -> Result<f64, HostStatus> {
                (**self).read_numeric(var, obs)
            }

            fn write_numeric(&mut self, var: i32, obs: i32, value: f64) -> Result<(), HostStatus> {
                (**self).write_numeric(var, obs, value)
            }

            fn read_text(&self, var: i32, obs: i32) -> Result<String, HostStatus> {
                (**self).read_text(var, obs)
            }

            fn write_text(&mut self, var: i32, obs: i32, value: &str) -> Result<(), HostStatus> {
                (**self).write_text(var, obs, value)
            }

            fn matrix_rows(&self, name: &str) -> i32 {
                (**self).matrix_rows(name)
            }

            fn matrix_cols(&self, name: &str) -> i32 {
                (**self).matrix_cols(name)
            }

            fn read_matrix(&self, name: &str, row: i32, col: i32) -> Result<f64, HostStatus> {
                (**self).read_matrix(name, row, col)
            }

            fn write_matrix(
                &mut self,
                name: &str,
                row: i32,
                col: i32,
                value: f64,
            ) -> Result<(), HostStatus> {
                (**self).write_matrix(name, row, col, value)
            }

            fn read_macro(&self, name: &str, buf_len: usize) -> Result<String, HostStatus> {
                (**self).read_macro(name, buf_len)
            }

            fn write_macro(&mut self, name: &str, value: &str) -> Result<(), HostStatus> {
                (**self).write_macro(name, value)
            }

            fn read_scalar(&self, name: &str) -> Result<f64, HostStatus> {
                (**self).read_scalar(name)
            }

            fn write_scalar(&mut self, name: &str, value: f64) -> Result<(), HostStatus> {
                (**self).write_scalar(name, value)
            }

            fn is_selected(&self, obs: i32) -> bool {
                (**self).is_selected(obs)
            }

            fn obs_range(&self) -> (i32, i32) {
                (**self).obs_range()
            }

            fn display(&mut self, text: &str) {
                (**self).display(text)
            }

            fn display_error(&mut self, text: &str) {
                (**self).display_error(text)
            }

            fn format_value(&self, fmt: &str, value: f64) -> String {
                (**self).format_value(fmt, value)
            }
        }
    )*};
}

forward_host!(&mut H, Box<H>);
