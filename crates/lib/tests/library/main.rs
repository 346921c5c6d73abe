//! Integration tests: project files evaluated end to end through a `Workspace`.

mod common;

mod composition_tests;
mod config_tests;
mod errors_tests;
mod toolchain_tests;
