//! Helper tables exposed to project files under `rig`.

pub mod path;
