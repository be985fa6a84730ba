//! Helpers for tests in this crate and in crates that depend on it (enable the `test_utils` feature).
pub mod fakes;
pub mod prepare_env;
