//! rig-lib: Core types and logic for rig
//!
//! This crate provides the build graph evaluator behind rig:
//! - `ConfigStore`: configuration variables resolved once per invocation
//! - `PropertySet`: ordered build properties composed across projects
//! - `Kit`: the immutable build context (platform and toolchains)
//! - `Project` and `GraphEvaluator`: named targets evaluated with memoization
//! - `Workspace`: a tree of `make.lua` project files loaded through Lua

pub mod backend;
pub mod config;
pub mod consts;
pub mod error;
pub mod eval;
pub mod glob;
pub mod kit;
pub mod lua;
pub mod project;
pub mod properties;
pub mod run;
pub mod target;
pub mod util;
pub mod workspace;

pub use error::EvalError;
