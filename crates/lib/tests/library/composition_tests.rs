use rig_lib::properties::Artifact;
use rig_lib::target::{RunMode, TargetOutput};

use super::common::{evaluate, fixture, kit, overrides};

const GPP7: &str = "linux:gpp=7.0";

#[test]
fn fungo_default_builds_everything_once() {
  let run = evaluate(&fixture("fungo"), "default", &kit(GPP7), overrides(&["flags=[\"debuggable\"]"])).unwrap();

  assert_eq!(run.report.output, TargetOutput::Nothing);
  // Eight fungo targets and test_o_matic's staticlib, each body run once.
  assert_eq!(run.report.body_runs, 9);
  assert_eq!(run.report.order.len(), 9);
  let staticlib = run
    .report
    .order
    .iter()
    .filter(|k| k.to_string() == "fungo:staticlib@linux:gpp=7.0")
    .count();
  assert_eq!(staticlib, 1);
  assert!(run.evaluated("test_o_matic:staticlib@linux:gpp=7.0"));
  assert!(!run.evaluated("fungo:testlibs@linux:gpp=7.0"));

  // fungo lib (2 compiles + archive), test_o_matic lib (1 + archive), two test
  // objects, the test binary (1 + link) and two examples (1 + link each).
  assert_eq!(run.steps.len(), 13);
}

#[test]
fn tests_are_scheduled_not_run() {
  let run = evaluate(&fixture("fungo"), "run_tests", &kit(GPP7), overrides(&["flags=[\"debuggable\"]"])).unwrap();

  assert_eq!(run.report.scheduled.len(), 1);
  let scheduled = &run.report.scheduled[0];
  assert_eq!(scheduled.mode, RunMode::Test);
  assert_eq!(scheduled.handle.name, "fungo_tests");
  assert_eq!(scheduled.handle.cwd, Some(fixture("fungo").join("tests")));
  assert!(scheduled.handle.program.ends_with("fungo/bin/fungo_tests"));
  assert_eq!(
    scheduled.scheduled_by.as_ref().map(ToString::to_string).as_deref(),
    Some("fungo:run_tests@linux:gpp=7.0")
  );
}

#[test]
fn test_objects_exclude_main() {
  let run = evaluate(&fixture("fungo"), "test_objects", &kit(GPP7), overrides(&["flags=[\"debuggable\"]"])).unwrap();

  let props = run.report.output.properties().unwrap();
  let sources: Vec<_> = props
    .objects
    .iter()
    .map(|o| o.source.file_name().unwrap().to_string_lossy().into_owned())
    .collect();
  assert_eq!(sources, ["cage_tests.cpp", "catcher_tests.cpp"]);

  let libs: Vec<_> = props.libraries.iter().map(|l| l.name.as_str()).collect();
  assert_eq!(libs, ["fungo", "test_o_matic"]);

  // Include paths from both projects, each resolved against its own root.
  let compile = run
    .steps
    .iter()
    .find(|s| s.target.name == "test_objects")
    .unwrap()
    .command_line();
  assert!(compile.contains(&format!("-I{}", fixture("fungo").join("include").display())));
  assert!(compile.contains(&format!("-I{}", fixture("test_o_matic").join("include").display())));
}

#[test]
fn sequence_outputs() {
  let run = evaluate(&fixture("fungo"), "testlibs", &kit(GPP7), overrides(&["flags=[\"debuggable\"]"])).unwrap();
  match &run.report.output {
    TargetOutput::Sequence(items) => match items.as_slice() {
      [TargetOutput::Artifact(Artifact::Library(lib))] => {
        assert_eq!(lib.name, "fungo_testlib");
        assert!(lib.path.ends_with("fungo/lib/libfungo_testlib.so"));
      }
      other => panic!("unexpected outputs {:?}", other),
    },
    other => panic!("expected a sequence, got {}", other),
  }

  let run = evaluate(&fixture("fungo"), "examples", &kit(GPP7), overrides(&["flags=[\"debuggable\"]"])).unwrap();
  let names: Vec<_> = run.report.output.processes().iter().map(|p| p.name.clone()).collect();
  assert_eq!(names, ["basic", "clone"]);
  assert!(run.report.scheduled.is_empty());
}

#[test]
fn dependency_graph_is_reported() {
  let run = evaluate(&fixture("fungo"), "default", &kit(GPP7), overrides(&["flags=[\"debuggable\"]"])).unwrap();

  let order: Vec<String> = run
    .report
    .dependency_order()
    .unwrap()
    .iter()
    .map(ToString::to_string)
    .collect();
  let position = |name: &str| order.iter().position(|k| k == name).unwrap();
  assert!(position("fungo:staticlib@linux:gpp=7.0") < position("fungo:test_objects@linux:gpp=7.0"));
  assert!(position("test_o_matic:staticlib@linux:gpp=7.0") < position("fungo:tests@linux:gpp=7.0"));
  assert_eq!(order.last().map(String::as_str), Some("fungo:default@linux:gpp=7.0"));

  let waves = run.report.waves();
  let first: Vec<String> = waves[0].iter().map(ToString::to_string).collect();
  assert!(first.contains(&"fungo:staticlib@linux:gpp=7.0".to_string()));
  assert!(first.contains(&"test_o_matic:staticlib@linux:gpp=7.0".to_string()));

  let dot = run.report.to_dot();
  assert!(dot.contains("\"fungo:test_objects@linux:gpp=7.0\" -> \"fungo:staticlib@linux:gpp=7.0\";"));
}

#[test]
fn shared_subproject_is_loaded_once() {
  let run = evaluate(&fixture("dbg"), "default", &kit(GPP7), overrides(&["flags=[\"debuggable\"]"])).unwrap();

  let tom = run
    .report
    .order
    .iter()
    .filter(|k| k.target.project == "test_o_matic")
    .count();
  assert_eq!(tom, 1);

  let props = run.report.output.properties().unwrap();
  let libs: Vec<_> = props.libraries.iter().map(|l| l.name.as_str()).collect();
  assert_eq!(libs, ["fungo", "dbg"]);
  assert_eq!(
    props.include_paths.as_slice(),
    [fixture("dbg").join("include"), fixture("fungo").join("include")]
  );

  let scheduled: Vec<_> = run.report.scheduled.iter().map(|r| r.handle.name.as_str()).collect();
  assert_eq!(scheduled, ["dbg_unittests"]);
}
