use std::cell::RefCell;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{BuildBackend, BuildStep, StepContext, StepKind};
use crate::error::EvalError;
use crate::kit::{Family, Platform};
use crate::properties::{Executable, LibraryKind, LibraryRef, ObjectRef, PropertySet};
use crate::util::hash::short_hash;

/// Plans toolchain invocations without running them.
///
/// Outputs are laid out as `<out>/<kit fingerprint>/<project>/{obj,lib,bin}`,
/// so kits never overwrite each other's artifacts.
pub struct PlanBackend {
  out_root: PathBuf,
  steps: RefCell<Vec<BuildStep>>,
}

impl PlanBackend {
  pub fn new(out_root: impl Into<PathBuf>) -> Self {
    Self {
      out_root: out_root.into(),
      steps: RefCell::new(Vec::new()),
    }
  }

  pub fn out_root(&self) -> &Path {
    &self.out_root
  }

  pub fn take_steps(&self) -> Vec<BuildStep> {
    self.steps.take()
  }

  fn dir(&self, ctx: &StepContext<'_>, kind: &str) -> PathBuf {
    self
      .out_root
      .join(ctx.kit.fingerprint())
      .join(&ctx.target.project)
      .join(kind)
  }

  fn record(&self, ctx: &StepContext<'_>, kind: StepKind, output: &Path, command: Vec<String>) {
    let mut steps = self.steps.borrow_mut();
    if steps.iter().any(|s| s.output == output) {
      return;
    }
    debug!(target_id = %ctx.target, kind = ?kind, output = %output.display(), "planned build step");
    steps.push(BuildStep {
      kind,
      target: ctx.target.clone(),
      kit: ctx.kit.to_string(),
      output: output.to_path_buf(),
      command,
    });
  }

  fn compile_command(ctx: &StepContext<'_>, opt: &PropertySet, source: &Path, object: &Path) -> Vec<String> {
    let driver = ctx.toolchain.id.driver().to_string();
    let mut cmd = vec![driver];
    match ctx.toolchain.id.family() {
      Family::Gnu => {
        cmd.push("-c".to_string());
        cmd.extend(opt.compiler_flags.iter().cloned());
        cmd.extend(opt.defines.iter().map(|d| format!("-D{}", d)));
        cmd.extend(opt.include_paths.iter().map(|i| format!("-I{}", i.display())));
        cmd.push(source.display().to_string());
        cmd.push("-o".to_string());
        cmd.push(object.display().to_string());
      }
      Family::Msvc => {
        cmd.push("/nologo".to_string());
        cmd.push("/c".to_string());
        cmd.extend(opt.compiler_flags.iter().cloned());
        cmd.extend(opt.defines.iter().map(|d| format!("/D{}", d)));
        cmd.extend(opt.include_paths.iter().map(|i| format!("/I{}", i.display())));
        cmd.push(source.display().to_string());
        cmd.push(format!("/Fo{}", object.display()));
      }
    }
    cmd
  }

  /// Compile `opt.sources` and return them followed by `opt.objects`.
  fn compile_all(&self, ctx: &StepContext<'_>, opt: &PropertySet) -> Vec<ObjectRef> {
    let ext = match ctx.toolchain.id.family() {
      Family::Gnu => "o",
      Family::Msvc => "obj",
    };
    let dir = self.dir(ctx, "obj");
    let mut objects = Vec::with_capacity(opt.sources.len() + opt.objects.len());
    for source in &opt.sources {
      let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
      // Same source built with different settings must land in a different object.
      let key = format!(
        "{}|{}|{}|{:?}",
        source.display(),
        opt.compiler_flags.join(" "),
        opt.defines.join(" "),
        opt.include_paths.as_slice()
      );
      let object = dir.join(format!("{}-{}.{}", stem, short_hash(key.as_bytes(), 8), ext));
      let command = Self::compile_command(ctx, opt, source, &object);
      self.record(ctx, StepKind::Compile, &object, command);
      objects.push(ObjectRef {
        path: object,
        source: source.clone(),
      });
    }
    objects.extend(opt.objects.iter().cloned());
    objects
  }

  fn link_inputs(objects: &[ObjectRef], opt: &PropertySet, family: Family) -> Vec<String> {
    let mut inputs: Vec<String> = objects.iter().map(|o| o.path.display().to_string()).collect();
    inputs.extend(opt.libraries.iter().map(|l| l.path.display().to_string()));
    inputs.extend(opt.system_libraries.iter().map(|s| match family {
      Family::Gnu => format!("-l{}", s),
      Family::Msvc => format!("{}.lib", s),
    }));
    inputs
  }

  fn require_inputs(what: &str, name: &str, objects: &[ObjectRef]) -> Result<(), EvalError> {
    if objects.is_empty() {
      return Err(EvalError::BuildStepFailed {
        step: format!("{} {}", what, name),
        message: "no sources or objects to link".to_string(),
      });
    }
    Ok(())
  }
}

impl BuildBackend for PlanBackend {
  fn objects(&self, ctx: &StepContext<'_>, opt: &PropertySet) -> Result<Vec<ObjectRef>, EvalError> {
    let objects = self.compile_all(ctx, opt);
    if opt.sources.is_empty() && opt.objects.is_empty() {
      debug!(target_id = %ctx.target, "no sources to compile");
    }
    Ok(objects)
  }

  fn static_library(&self, ctx: &StepContext<'_>, name: &str, opt: &PropertySet) -> Result<LibraryRef, EvalError> {
    let objects = self.compile_all(ctx, opt);
    Self::require_inputs("archive", name, &objects)?;
    let family = ctx.toolchain.id.family();
    let file = match family {
      Family::Gnu => format!("lib{}.a", name),
      Family::Msvc => format!("{}.lib", name),
    };
    let path = self.dir(ctx, "lib").join(file);
    let objs = objects.iter().map(|o| o.path.display().to_string());
    let command = match family {
      Family::Gnu => ["ar".to_string(), "rcs".to_string(), path.display().to_string()]
        .into_iter()
        .chain(objs)
        .collect(),
      Family::Msvc => [
        "lib".to_string(),
        "/nologo".to_string(),
        format!("/OUT:{}", path.display()),
      ]
      .into_iter()
      .chain(objs)
      .collect(),
    };
    self.record(ctx, StepKind::Archive, &path, command);
    Ok(LibraryRef {
      name: name.to_string(),
      path,
      kind: LibraryKind::Static,
    })
  }

  fn shared_library(&self, ctx: &StepContext<'_>, name: &str, opt: &PropertySet) -> Result<LibraryRef, EvalError> {
    let objects = self.compile_all(ctx, opt);
    Self::require_inputs("link", name, &objects)?;
    let family = ctx.toolchain.id.family();
    let file = match ctx.kit.platform() {
      Platform::Windows => format!("{}.dll", name),
      Platform::MacOs => format!("lib{}.dylib", name),
      Platform::Linux => format!("lib{}.so", name),
    };
    let path = self.dir(ctx, "lib").join(file);
    let mut command = match family {
      Family::Gnu => vec![
        ctx.toolchain.id.driver().to_string(),
        "-shared".to_string(),
        "-o".to_string(),
        path.display().to_string(),
      ],
      Family::Msvc => vec![
        "link".to_string(),
        "/nologo".to_string(),
        "/DLL".to_string(),
        format!("/OUT:{}", path.display()),
      ],
    };
    command.extend(Self::link_inputs(&objects, opt, family));
    self.record(ctx, StepKind::LinkShared, &path, command);
    Ok(LibraryRef {
      name: name.to_string(),
      path,
      kind: LibraryKind::Shared,
    })
  }

  fn executable(&self, ctx: &StepContext<'_>, name: &str, opt: &PropertySet) -> Result<Executable, EvalError> {
    let objects = self.compile_all(ctx, opt);
    Self::require_inputs("link", name, &objects)?;
    let family = ctx.toolchain.id.family();
    let file = match ctx.kit.platform() {
      Platform::Windows => format!("{}.exe", name),
      _ => name.to_string(),
    };
    let path = self.dir(ctx, "bin").join(file);
    let mut command = match family {
      Family::Gnu => vec![
        ctx.toolchain.id.driver().to_string(),
        "-o".to_string(),
        path.display().to_string(),
      ],
      Family::Msvc => vec![
        "link".to_string(),
        "/nologo".to_string(),
        format!("/OUT:{}", path.display()),
      ],
    };
    command.extend(Self::link_inputs(&objects, opt, family));
    self.record(ctx, StepKind::LinkExecutable, &path, command);
    Ok(Executable {
      name: name.to_string(),
      path,
    })
  }

  fn steps(&self) -> Vec<BuildStep> {
    self.steps.borrow().clone()
  }
}
