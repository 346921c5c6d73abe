use rig_lib::config::{ConfigOverrides, Resolution, Value};
use rig_lib::workspace::Workspace;

use super::common::{evaluate, fixture, kit, overrides, project_tree};

#[test]
fn alias_reaches_every_project() {
  let run = evaluate(
    &fixture("fungo"),
    "test_objects",
    &kit("linux:gpp=7.0"),
    overrides(&["flags=[\"warnings\", \"release\"]"]),
  )
  .unwrap();

  for step in &run.steps {
    let line = step.command_line();
    if line.contains(" -c ") {
      assert!(line.contains("-Wall -Wextra"), "{}", line);
      assert!(line.contains("-DNDEBUG"), "{}", line);
    }
  }
}

#[test]
fn qualified_name_wins_over_alias() {
  let run = evaluate(
    &fixture("fungo"),
    "test_objects",
    &kit("linux:gpp=7.0"),
    overrides(&["flags=debuggable", "test_o_matic.flags=[\"strict\"]"]),
  )
  .unwrap();

  let tom = run.steps.iter().find(|s| s.target.project == "test_o_matic").unwrap();
  assert!(tom.command_line().contains("-pedantic"));
  assert!(!tom.command_line().contains(" -g "));

  let fungo = run.steps.iter().find(|s| s.target.project == "fungo").unwrap();
  assert!(fungo.command_line().contains(" -g "));
}

#[test]
fn missing_variable_fails_the_load() {
  let err = Workspace::load(&fixture("fungo"), overrides(&[])).err().unwrap();
  assert_eq!(err.kind(), "MissingConfigurationError");
  assert!(err.root_cause().to_string().contains("fungo.flags"));
}

#[test]
fn missing_subproject_root_fails_the_load() {
  let mut overrides = ConfigOverrides::new();
  overrides.parse_assignment("flags=[]").unwrap();
  let err = Workspace::load(&fixture("fungo"), overrides).err().unwrap();
  assert_eq!(err.kind(), "MissingConfigurationError");
  assert!(err.to_string().contains("test_o_matic.root"));
}

#[test]
fn declared_variables_and_resolutions() {
  let workspace = Workspace::load(&fixture("dbg"), overrides(&["flags=[]", "unused.knob=1"])).unwrap();
  let config = workspace.config();

  let names: Vec<_> = config.variables().map(|v| v.name.as_str()).collect();
  for name in ["dbg.flags", "dbg.optimize_out", "fungo.flags", "test_o_matic.flags", "test_o_matic.root"] {
    assert!(names.contains(&name), "{} not declared", name);
  }

  assert!(matches!(
    config.resolution("dbg.flags"),
    Some(Resolution::Override { key, .. }) if key == "flags"
  ));
  assert_eq!(config.resolve("dbg.optimize_out").unwrap(), Value::Bool(false));
  assert_eq!(config.resolve("dbg.dbghelp_dll_path").unwrap(), Value::Null);
  assert_eq!(config.unused_overrides(), ["unused.knob"]);
}

#[test]
fn default_and_optional_values_reach_lua() {
  let tree = project_tree(&[(
    "make.lua",
    r#"
      project("knobs")
      local level = cfgvar("knobs.level", { default = 2 })
      local name = cfgvar("knobs.name", { optional = true })
      local mode = cfgvar("knobs.mode", "mode")

      target("default", function(kit)
        assert(level == 2, "level")
        assert(name == nil, "name")
        return properties { defines = { "MODE_" .. mode, "LEVEL=" .. level } }
      end)
    "#,
  )]);

  let mut overrides = ConfigOverrides::new();
  overrides.parse_assignment("mode=fast").unwrap();
  let run = evaluate(tree.path(), "default", &kit("linux:gpp=7.0"), overrides).unwrap();
  let props = run.report.output.properties().unwrap();
  assert_eq!(props.defines.as_slice(), ["MODE_fast", "LEVEL=2"]);
}

#[test]
fn first_definition_wins() {
  let tree = project_tree(&[
    (
      "make.lua",
      r#"
        project("app")
        local level = cfgvar("shared.level", { default = 1 })
        local lib = subproject("lib")
        target("default", function(kit)
          return properties { defines = { "APP=" .. level } } + lib.default(kit)
        end)
      "#,
    ),
    (
      "lib/make.lua",
      r#"
        project("lib")
        local level = cfgvar("shared.level", { default = 9 })
        target("default", function(kit)
          return properties { defines = { "LIB=" .. level } }
        end)
      "#,
    ),
  ]);

  let run = evaluate(tree.path(), "default", &kit("linux:gpp=7.0"), ConfigOverrides::new()).unwrap();
  let props = run.report.output.properties().unwrap();
  assert_eq!(props.defines.as_slice(), ["APP=1", "LIB=1"]);
}
