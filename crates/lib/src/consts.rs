/// Application name, used for log targets and default directories.
pub const APP_NAME: &str = "rig";

/// File name of a project description inside a project directory.
pub const PROJECT_FILE: &str = "make.lua";

/// Directory (relative to the root project) receiving planned artifacts.
pub const DEFAULT_OUT_DIR: &str = ".rig-out";

/// Environment variable overriding the output directory.
pub const OUT_DIR_ENV: &str = "RIG_OUT_DIR";

/// Environment variable naming a JSON file of configuration overrides.
pub const CONFIG_FILE_ENV: &str = "RIG_CONFIG";

/// Length of the hex prefix used for kit and source fingerprints.
pub const FINGERPRINT_LEN: usize = 12;

/// Name of the target requested when none is given.
pub const DEFAULT_TARGET: &str = "default";
