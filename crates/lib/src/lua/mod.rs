//! Lua front-end for `make.lua` project files.
//!
//! Project files declare a project, its configuration variables, its
//! subprojects and its targets. Everything a file sees is set up here:
//!
//! - [`runtime`] - the shared Lua state and its globals (`rig`, `concat`)
//! - [`loader`] - per-file environments and the declaration functions
//! - [`convert`] - conversions between Lua values and evaluator types
//! - [`helpers`] - helper tables exposed under `rig`
//!
//! Kits, property sets, processes and target handles cross into Lua as
//! userdata.

pub mod convert;
mod handles;
pub mod helpers;
mod kit;
pub mod loader;
mod props;
pub mod runtime;

pub use handles::{LuaProcess, LuaProjectHandle, LuaTargetHandle};
pub use kit::{LuaCpp, LuaKit};
pub use props::LuaProperties;
