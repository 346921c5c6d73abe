use std::rc::Rc;

use rig_lib::EvalError;
use rig_lib::backend::PlanBackend;
use rig_lib::config::ConfigOverrides;
use rig_lib::workspace::Workspace;

use super::common::{evaluate, kit, project_tree};

const GPP7: &str = "linux:gpp=7.0";

fn run(files: &[(&str, &str)], request: &str) -> EvalError {
  let tree = project_tree(files);
  evaluate(tree.path(), request, &kit(GPP7), ConfigOverrides::new())
    .err()
    .expect("evaluation should fail")
}

fn load(files: &[(&str, &str)]) -> EvalError {
  let tree = project_tree(files);
  Workspace::load(tree.path(), ConfigOverrides::new())
    .err()
    .expect("loading should fail")
}

#[test]
fn cycle_between_targets() {
  let err = run(
    &[(
      "make.lua",
      r#"
        project("app")
        target("a", function(kit) return b(kit) end)
        target("b", function(kit) return a(kit) end)
        target("default", function(kit) return a(kit) end)
      "#,
    )],
    "default",
  );
  assert_eq!(err.kind(), "CyclicDependencyError");
  let cause = err.root_cause().to_string();
  assert!(cause.contains("app:a@linux:gpp=7.0 -> app:b@linux:gpp=7.0 -> app:a@linux:gpp=7.0"), "{}", cause);
}

#[test]
fn caught_cycle_still_aborts() {
  let err = run(
    &[(
      "make.lua",
      r#"
        project("app")
        target("a", function(kit)
          local ok, out = pcall(b, kit)
          if ok then return out end
          return properties { defines = { "B_FAILED" } }
        end)
        target("b", function(kit) return a(kit) end)
      "#,
    )],
    "a",
  );
  assert_eq!(err.kind(), "CyclicDependencyError");
  assert_eq!(err.target_chain(), ["app:a@linux:gpp=7.0", "app:b@linux:gpp=7.0"]);
}

#[test]
fn caught_dependency_failure_still_aborts() {
  let err = run(
    &[(
      "make.lua",
      r#"
        project("app")
        target("lib", function(kit)
          return properties { defines = { cfgvar("app.late") } }
        end)
        target("default", function(kit)
          pcall(lib, kit)
          return properties { defines = { "APP" } }
        end)
      "#,
    )],
    "default",
  );
  assert_eq!(err.kind(), "MissingConfigurationError");
  assert_eq!(err.target_chain(), ["app:default@linux:gpp=7.0", "app:lib@linux:gpp=7.0"]);
}

#[test]
fn unknown_target_of_a_subproject() {
  let err = run(
    &[
      (
        "make.lua",
        r#"
          project("app")
          local lib = subproject("lib")
          target("default", function(kit) return lib.sharedlib(kit) end)
        "#,
      ),
      ("lib/make.lua", r#"project("lib") target("staticlib", function(kit) end)"#),
    ],
    "default",
  );
  assert_eq!(err.kind(), "UnknownTargetError");
  assert!(err.root_cause().to_string().contains("sharedlib"));
  assert_eq!(err.target_chain(), ["app:default@linux:gpp=7.0"]);
}

#[test]
fn malformed_project_files() {
  let err = load(&[(
    "make.lua",
    r#"
      project("app")
      target("default", function(kit) end)
      target("default", function(kit) end)
    "#,
  )]);
  assert_eq!(err.kind(), "DefinitionError");
  assert!(err.to_string().contains("declared twice"));

  let err = load(&[("make.lua", r#"target("default", function(kit) end)"#)]);
  assert_eq!(err.kind(), "DefinitionError");
  assert!(err.to_string().contains("before project"));

  let err = load(&[("make.lua", r#"project("app") project("other")"#)]);
  assert_eq!(err.kind(), "DefinitionError");

  let err = load(&[("make.lua", "local x = 1")]);
  assert_eq!(err.kind(), "DefinitionError");
  assert!(err.to_string().contains("never calls project"));
}

#[test]
fn cyclic_subprojects() {
  let err = load(&[
    ("make.lua", r#"project("app") subproject("lib")"#),
    ("lib/make.lua", r#"project("lib") subproject("..")"#),
  ]);
  assert_eq!(err.kind(), "DefinitionError");
  assert!(err.to_string().contains("cyclic subproject"));
}

#[test]
fn globs() {
  let files = [
    (
      "make.lua",
      r#"
        project("app")
        target("required", function(kit)
          return properties { sources = glob("src/*.c") }
        end)
        target("optional", function(kit)
          return properties { sources = glob("src/*.c", { optional = true }) }
        end)
      "#,
    ),
    ("src/main.cpp", ""),
  ];
  let err = run(&files, "required");
  assert_eq!(err.kind(), "GlobError");
  assert!(err.root_cause().to_string().contains("src/*.c"));

  let tree = project_tree(&files);
  let ok = evaluate(tree.path(), "optional", &kit(GPP7), ConfigOverrides::new()).unwrap();
  assert!(ok.report.output.properties().unwrap().sources.is_empty());
}

#[test]
fn glob_at_load_time_is_rejected() {
  let err = load(&[("make.lua", r#"project("app") local files = glob("*.lua")"#)]);
  assert_eq!(err.kind(), "GlobError");
}

#[test]
fn unknown_build_flag() {
  let err = run(
    &[(
      "make.lua",
      r#"
        project("app")
        target("default", function(kit) return kit.cpp:opt({ "turbo" }) end)
      "#,
    )],
    "default",
  );
  assert_eq!(err.kind(), "InvalidValueError");
  assert!(err.root_cause().to_string().contains("turbo"));
}

#[test]
fn failures_carry_the_target_chain() {
  let err = run(
    &[
      (
        "make.lua",
        r#"
          project("app")
          local lib = subproject("lib")
          target("default", function(kit) return lib.default(kit) end)
        "#,
      ),
      (
        "lib/make.lua",
        r#"
          project("lib")
          target("inner", function(kit) error("compiler exploded") end)
          target("default", function(kit) return inner(kit) end)
        "#,
      ),
    ],
    "default",
  );
  assert_eq!(err.kind(), "ScriptError");
  assert!(err.root_cause().to_string().contains("compiler exploded"));
  assert_eq!(
    err.target_chain(),
    [
      "app:default@linux:gpp=7.0",
      "lib:default@linux:gpp=7.0",
      "lib:inner@linux:gpp=7.0",
    ]
  );
}

#[test]
fn missing_value_fails_where_it_is_declared() {
  let err = load(&[(
    "make.lua",
    r#"
      project("app")
      local prefix = cfgvar("app.prefix")
      target("unused", function(kit) return properties { defines = { "OK" } } end)
      target("used", function(kit) return properties { defines = { prefix .. "_DEBUG" } } end)
    "#,
  )]);
  assert_eq!(err.kind(), "MissingConfigurationError");
  assert!(err.root_cause().to_string().contains("app.prefix"));
}

#[test]
fn missing_values_never_reach_the_toolchain() {
  let tree = project_tree(&[
    (
      "make.lua",
      r#"
        project("app")
        local platform = cfgvar("app.platform")
        local fast = cfgvar("app.fast")
        target("default", function(kit)
          local opt = kit.cpp:opt({})
          if platform == "windows" then opt:append("syslibs", "dbghelp") end
          if fast then opt:append("defines", "FAST") end
          opt:append("sources", glob("src/*.cpp"))
          return properties { libs = { kit.cpp:lib("app", opt) } }
        end)
      "#,
    ),
    ("src/a.cpp", ""),
  ]);
  let backend = Rc::new(PlanBackend::new("/out"));
  let err = Workspace::load(tree.path(), ConfigOverrides::new())
    .and_then(|ws| ws.evaluate("default", &kit(GPP7), backend.clone()))
    .err()
    .expect("evaluation should fail");
  assert_eq!(err.kind(), "MissingConfigurationError");
  assert!(err.root_cause().to_string().contains("app.platform"));
  assert!(backend.take_steps().is_empty());

  let mut overrides = ConfigOverrides::new();
  overrides.parse_assignment("app.platform=linux").unwrap();
  overrides.parse_assignment("app.fast=false").unwrap();
  let ok = evaluate(tree.path(), "default", &kit(GPP7), overrides).unwrap();
  assert!(ok.commands().iter().all(|c| !c.contains("FAST")));
}

#[test]
fn cfgvar_inside_a_target_fails_with_the_target() {
  let err = run(
    &[(
      "make.lua",
      r#"
        project("app")
        target("default", function(kit)
          return properties { defines = { cfgvar("app.late") } }
        end)
      "#,
    )],
    "default",
  );
  assert_eq!(err.kind(), "MissingConfigurationError");
  assert_eq!(err.target_chain().len(), 1);
  assert!(err.root_cause().to_string().contains("app.late"));
}

#[test]
fn bad_property_values() {
  let err = run(
    &[(
      "make.lua",
      r#"
        project("app")
        target("default", function(kit) return properties { flavours = { "x" } } end)
      "#,
    )],
    "default",
  );
  assert_eq!(err.kind(), "InvalidValueError");
}
