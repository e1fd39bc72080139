//! Unit tests for plan loading and validation.

use std::fs;
use std::time::Duration;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::context::{PipelineSettings, StepContext};
use crate::environment::EnvironmentContext;

const SAMPLE_PLAN: &str = r#"{
  "groups": [
    {
      "name": "sanity-python",
      "plugin": "python311",
      "test": { "kind": "compiled_suite", "source": "sanity/APITestPython3.java" }
    },
    {
      "name": "sanity-go",
      "plugin": "go",
      "build": "sanity/go/build_guest.py",
      "artifacts": ["TestRuntime"],
      "timeout_secs": 600,
      "test": { "kind": "compiled_suite", "source": "sanity/APITestGo.java" }
    },
    {
      "name": "extended-python",
      "plugin": "python311",
      "requires": [{ "module": "bs4", "package": "beautifulsoup4" }, { "module": "numpy" }],
      "test": { "kind": "unittest", "path": "extended/test_extended.py" }
    }
  ]
}"#;

#[fixture]
fn plan_dir() -> TempDir {
    let dir = TempDir::new().expect("create plan dir");
    fs::write(dir.path().join("bridgecheck.json"), SAMPLE_PLAN).expect("write plan");
    dir
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[rstest]
fn load_resolves_groups_in_order(plan_dir: TempDir) {
    let plan = Plan::load(&plan_dir.path().join("bridgecheck.json")).expect("load plan");
    let names: Vec<&str> = plan.groups().iter().map(StepGroup::name).collect();
    assert_eq!(names, ["sanity-python", "sanity-go", "extended-python"]);
    assert_eq!(plan.plugins(), ["python311", "go"]);
    assert!(plan.base_dir().is_absolute());
}

#[rstest]
fn load_resolves_relative_paths_against_plan_directory(plan_dir: TempDir) {
    let plan = Plan::load(&plan_dir.path().join("bridgecheck.json")).expect("load plan");
    let go = plan.groups().get(1).expect("second group");
    let build = go.build().expect("build step");
    assert_eq!(build.path(), plan.base_dir().join("sanity/go/build_guest.py"));
    assert_eq!(build.mode(), ScriptMode::Plain);
    assert_eq!(build.directory(), plan.base_dir().join("sanity/go"));
    assert_eq!(go.timeout(), Some(Duration::from_secs(600)));

    match go.test() {
        Step::CompiledSuite(suite) => {
            assert_eq!(suite.suite_name(), "APITestGo");
            assert_eq!(suite.directory(), plan.base_dir().join("sanity"));
        }
        Step::Script(_) => panic!("expected compiled suite"),
    }
}

#[rstest]
fn load_defaults_package_to_module_name(plan_dir: TempDir) {
    let plan = Plan::load(&plan_dir.path().join("bridgecheck.json")).expect("load plan");
    let extended = plan.groups().get(2).expect("third group");
    let requirements: Vec<(&str, &str)> = extended
        .requirements()
        .iter()
        .map(|req| (req.module(), req.package()))
        .collect();
    assert_eq!(requirements, [("bs4", "beautifulsoup4"), ("numpy", "numpy")]);
    assert!(matches!(
        extended.test(),
        Step::Script(script) if script.mode() == ScriptMode::UnitTest
    ));
}

#[rstest]
fn load_keeps_group_timeouts(plan_dir: TempDir) {
    let plan = Plan::load(&plan_dir.path().join("bridgecheck.json")).expect("load plan");
    let timeouts: Vec<Option<Duration>> = plan.groups().iter().map(StepGroup::timeout).collect();
    assert_eq!(timeouts, [None, Some(Duration::from_secs(600)), None]);
}

#[test]
fn zero_group_timeout_runs_without_limit() {
    let dir = TempDir::new().expect("create plan dir");
    let path = dir.path().join("bridgecheck.json");
    let document = r#"{ "groups": [ {
        "name": "slow-go",
        "plugin": "go",
        "timeout_secs": 0,
        "test": { "kind": "unittest", "path": "go/test_guest.py" }
    } ] }"#;
    fs::write(&path, document).expect("write plan");
    let plan = Plan::load(&path).expect("load plan");
    let group = plan.groups().first().expect("one group");
    let settings = PipelineSettings::new(plan.base_dir())
        .with_step_timeout(Some(Duration::from_secs(300)));
    let env = EnvironmentContext::default();

    let context = StepContext::new(group, &env, &settings);

    assert_eq!(context.timeout(), None);
}

#[test]
fn load_reports_missing_document() {
    let dir = TempDir::new().expect("temp dir");
    let err = Plan::load(&dir.path().join("absent.json")).expect_err("missing plan");
    assert!(matches!(err, PlanError::Read { .. }));
}

#[rstest]
#[case::not_json("groups = []")]
#[case::unknown_kind(r#"{"groups":[{"name":"a","plugin":"go","test":{"kind":"jar","path":"x"}}]}"#)]
#[case::unknown_field(r#"{"groups":[],"extra":true}"#)]
#[case::missing_test(r#"{"groups":[{"name":"a","plugin":"go"}]}"#)]
fn load_rejects_malformed_documents(#[case] contents: &str) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("plan.json");
    fs::write(&path, contents).expect("write plan");
    let err = Plan::load(&path).expect_err("malformed plan");
    assert!(matches!(err, PlanError::Parse { .. }), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn unittest(path: &str) -> Step {
    Step::Script(ScriptStep::new(path, ScriptMode::UnitTest))
}

#[rstest]
#[case::empty_name(vec![StepGroup::new(" ", "go", unittest("/t.py"))], "name")]
#[case::empty_plugin(vec![StepGroup::new("a", "", unittest("/t.py"))], "plugin")]
#[case::duplicate(
    vec![
        StepGroup::new("a", "go", unittest("/t.py")),
        StepGroup::new("a", "python311", unittest("/u.py")),
    ],
    "more than once"
)]
#[case::artifacts_without_build(
    vec![StepGroup::new("a", "go", unittest("/t.py")).with_artifact("Guest")],
    "no build step"
)]
fn new_rejects_invalid_groups(#[case] groups: Vec<StepGroup>, #[case] expected: &str) {
    let err = Plan::new(groups, "/plans").expect_err("invalid plan");
    assert!(
        err.to_string().contains(expected),
        "expected '{expected}' in: {err}"
    );
}

#[test]
fn compiled_suite_requires_a_file_stem() {
    let err = CompiledSuiteStep::new("/").expect_err("no stem");
    assert!(matches!(err, PlanError::Invalid { .. }));
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[test]
fn artifact_paths_live_next_to_build_script() {
    let group = StepGroup::new("go", "go", unittest("/suite/t.py"))
        .with_build("/suite/go/build_guest.py")
        .with_artifact("TestRuntime")
        .with_artifact("BytesPrinter");
    let suffix = crate::platform::artifact_suffix();
    assert_eq!(
        group.artifact_paths("Guest"),
        [
            PathBuf::from(format!("/suite/go/TestRuntime_Guest{suffix}")),
            PathBuf::from(format!("/suite/go/BytesPrinter_Guest{suffix}")),
        ]
    );
}

#[test]
fn groups_without_build_own_no_artifacts() {
    let group = StepGroup::new("py", "python311", unittest("/suite/t.py"));
    assert!(group.artifact_paths("Guest").is_empty());
}
