//! Configuration variables.
//!
//! A [`ConfigStore`] holds the variables declared by project files and the
//! overrides given for one build invocation. Every variable is resolved exactly
//! once; targets read values through an immutable [`ConfigSnapshot`].

mod store;
mod value;

pub use store::{ConfigOverrides, ConfigSnapshot, ConfigStore, ConfigVariable, Resolution};
pub use value::Value;
