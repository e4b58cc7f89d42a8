//! The `utils` module provides the pieces shared by the rest of `stanbridge`:
//! the error types every layer returns, and logging initialisation for
//! binaries and tests.

pub mod error;
pub mod logging;
