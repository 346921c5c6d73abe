use std::rc::Rc;

use rig_lib::backend::PlanBackend;
use rig_lib::workspace::Workspace;

use super::common::{evaluate, fixture, kit, overrides, project_tree};

#[test]
fn missing_toolchain_branch_contributes_nothing() {
  let run = evaluate(&fixture("dbg"), "symbols", &kit("linux:gpp=7.0"), overrides(&["flags=[]"])).unwrap();
  let props = run.report.output.properties().unwrap();
  assert!(props.is_empty());
  assert!(run.steps.is_empty());

  let run = evaluate(&fixture("dbg"), "default", &kit("linux:gpp=7.0"), overrides(&["flags=[]"])).unwrap();
  let props = run.report.output.properties().unwrap();
  assert!(props.defines.is_empty());
  assert!(props.system_libraries.is_empty());
}

#[test]
fn microsoft_toolchain_on_windows() {
  let run = evaluate(
    &fixture("dbg"),
    "default",
    &kit("windows:mscl=19.0"),
    overrides(&["flags=[\"debuggable\"]", "dbg.platform=windows"]),
  )
  .unwrap();

  let props = run.report.output.properties().unwrap();
  assert_eq!(props.defines.as_slice(), ["DBG_USE_DBGHELP"]);
  assert_eq!(props.system_libraries.as_slice(), ["dbghelp"]);
  assert!(props.libraries.iter().all(|l| l.path.to_string_lossy().ends_with(".lib")));

  let commands = run.commands();
  let dbg_compiles: Vec<_> = run
    .steps
    .iter()
    .filter(|s| s.target.name == "full_staticlib" && s.command[0] == "cl")
    .map(|s| s.command_line())
    .collect();
  assert!(!dbg_compiles.is_empty());
  assert!(dbg_compiles.iter().all(|c| c.contains("/Oy-")), "{:#?}", dbg_compiles);
  assert!(commands.iter().any(|c| c.contains("symbols") && c.contains("msvc")));
  assert!(!commands.iter().any(|c| c.contains("mingw")));
}

#[test]
fn frame_pointers_are_kept_for_dbg_only() {
  let run = evaluate(&fixture("dbg"), "staticlib", &kit("linux:gpp=7.0"), overrides(&["flags=[\"optimise\"]"])).unwrap();

  let compiles = |project: &str| -> Vec<String> {
    run
      .steps
      .iter()
      .filter(|s| s.target.project == project && s.command.iter().any(|a| a == "-c"))
      .map(|s| s.command_line())
      .collect()
  };
  let fungo = compiles("fungo");
  let dbg = compiles("dbg");
  assert!(!fungo.is_empty() && !dbg.is_empty());
  assert!(fungo.iter().all(|c| c.contains("-O2 -fomit-frame-pointer")));
  assert!(dbg.iter().all(|c| c.contains("-O2") && !c.contains("-fomit-frame-pointer")));
}

#[test]
fn optimized_out_library_only_forwards_fungo() {
  let run = evaluate(
    &fixture("dbg"),
    "staticlib",
    &kit("linux:gpp=7.0"),
    overrides(&["flags=[]", "dbg.optimize_out=true"]),
  )
  .unwrap();
  let props = run.report.output.properties().unwrap();
  let libs: Vec<_> = props.libraries.iter().map(|l| l.name.as_str()).collect();
  assert_eq!(libs, ["fungo"]);
  assert!(run.steps.iter().all(|s| s.target.project == "fungo"));
}

#[test]
fn versions_are_separate_kits() {
  let workspace = Workspace::load(&fixture("fungo"), overrides(&["flags=[]"])).unwrap();
  let backend = Rc::new(PlanBackend::new("/out"));

  let seven = workspace.evaluate("staticlib", &kit("linux:gpp=7.0"), backend.clone()).unwrap();
  let eight = workspace.evaluate("staticlib", &kit("linux:gpp=8.0"), backend.clone()).unwrap();
  assert_eq!(seven.body_runs, 1);
  assert_eq!(eight.body_runs, 1);

  let path = |report: &rig_lib::eval::EvaluationReport| report.output.properties().unwrap().libraries[0].path.clone();
  assert_ne!(path(&seven), path(&eight));
  // Neither kit's steps were deduplicated against the other's.
  assert_eq!(backend.take_steps().len(), 6);
}

#[test]
fn kit_is_visible_to_lua() {
  let tree = project_tree(&[(
    "make.lua",
    r#"
      project("probe")

      target("default", function(kit)
        local v = kit.cpp.compiler.version
        local defines = {
          "PLATFORM_" .. kit.platform,
          "COMPILER_" .. kit.cpp.compiler.id,
          "VERSION=" .. v.major .. "." .. v.minor,
        }
        if kit:version("clang") == nil then
          defines[#defines + 1] = "NO_CLANG"
        end
        for _, id in ipairs(kit:installed()) do
          defines[#defines + 1] = "HAS_" .. id
        end
        return properties { defines = defines }
      end)
    "#,
  )]);

  let run = evaluate(tree.path(), "default", &kit("linux:gpp=8.1"), Default::default()).unwrap();
  let props = run.report.output.properties().unwrap();
  assert_eq!(
    props.defines.as_slice(),
    ["PLATFORM_linux", "COMPILER_gpp", "VERSION=8.1", "NO_CLANG", "HAS_gpp"]
  );
}

#[test]
fn kit_without_cpp_toolchain() {
  let tree = project_tree(&[(
    "make.lua",
    r#"
      project("bare")
      target("default", function(kit)
        return properties { defines = { kit.cpp.compiler.id } }
      end)
    "#,
  )]);

  // The absence is raised directly by the body, so it counts as an empty result.
  let run = evaluate(tree.path(), "default", &kit("linux"), Default::default()).unwrap();
  assert!(run.report.output.properties().unwrap().is_empty());
}
