//! Abstract build flags.
//!
//! Project configuration names build intentions (`debuggable`, `optimise`,
//! `warnings`, ...) rather than compiler switches. Each toolchain family
//! expands them into its own flags and defines.

use super::toolchain::Family;
use crate::error::EvalError;

/// Concrete compiler settings produced from abstract flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expanded {
  pub compiler_flags: Vec<String>,
  pub defines: Vec<String>,
}

impl Expanded {
  fn flags(&mut self, flags: &[&str]) {
    self.compiler_flags.extend(flags.iter().map(|f| f.to_string()));
  }

  fn define(&mut self, define: &str) {
    self.defines.push(define.to_string());
  }
}

/// Expand abstract flags for a toolchain family, keeping their order.
pub fn expand_flags<S: AsRef<str>>(family: Family, abstract_flags: &[S]) -> Result<Expanded, EvalError> {
  let mut out = Expanded::default();
  for flag in abstract_flags {
    let flag = flag.as_ref();
    match (family, flag) {
      (Family::Gnu, "debuggable") => out.flags(&["-g"]),
      (Family::Gnu, "optimise" | "optimize") => out.flags(&["-O2", "-fomit-frame-pointer"]),
      (Family::Gnu, "warnings") => out.flags(&["-Wall", "-Wextra"]),
      (Family::Gnu, "warnings-as-errors") => out.flags(&["-Werror"]),
      (Family::Gnu, "strict") => out.flags(&["-pedantic"]),
      (Family::Gnu, "strip-symbols") => out.flags(&["-s"]),
      (Family::Gnu, "debug-info-internal") => out.flags(&["-g"]),
      (Family::Gnu, "debug-info-external") => out.flags(&["-g", "-gsplit-dwarf"]),

      (Family::Msvc, "debuggable") => out.flags(&["/Zi", "/MDd"]),
      (Family::Msvc, "optimise" | "optimize") => out.flags(&["/O2", "/Oy"]),
      (Family::Msvc, "warnings") => out.flags(&["/W4"]),
      (Family::Msvc, "warnings-as-errors") => out.flags(&["/WX"]),
      (Family::Msvc, "strict") => out.flags(&["/Za"]),
      (Family::Msvc, "strip-symbols") => {}
      (Family::Msvc, "debug-info-internal") => out.flags(&["/Z7"]),
      (Family::Msvc, "debug-info-external") => out.flags(&["/Zi"]),

      (_, "release") => out.define("NDEBUG"),
      (_, other) => {
        return Err(EvalError::InvalidValue {
          message: format!("unknown abstract build flag '{}'", other),
        });
      }
    }
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gnu_expansion_keeps_order() {
    let out = expand_flags(Family::Gnu, &["warnings", "debuggable"]).unwrap();
    assert_eq!(out.compiler_flags, ["-Wall", "-Wextra", "-g"]);
    assert!(out.defines.is_empty());
  }

  #[test]
  fn msvc_expansion() {
    let out = expand_flags(Family::Msvc, &["optimise", "strict"]).unwrap();
    assert_eq!(out.compiler_flags, ["/O2", "/Oy", "/Za"]);
  }

  #[test]
  fn release_is_a_define() {
    let out = expand_flags(Family::Gnu, &["release"]).unwrap();
    assert_eq!(out.defines, ["NDEBUG"]);
    assert!(out.compiler_flags.is_empty());
  }

  #[test]
  fn unknown_flag_fails() {
    let err = expand_flags(Family::Gnu, &["fast"]).unwrap_err();
    assert_eq!(err.kind(), "InvalidValueError");
    assert!(err.to_string().contains("fast"));
  }

  #[test]
  fn no_flags_no_output() {
    let empty: [&str; 0] = [];
    assert_eq!(expand_flags(Family::Msvc, &empty).unwrap(), Expanded::default());
  }
}
