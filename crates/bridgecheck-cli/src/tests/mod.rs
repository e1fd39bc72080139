//! Test harness for the CLI runtime.
//!
//! The harness writes a plan document and an installation root into a
//! temporary directory, then runs the CLI against a scripted process runner
//! so no real interpreter or compiler is spawned.


use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use bridgecheck_pipeline::{ExecutionOutcome, Invocation};
use serde_json::{Value, json};
use tempfile::TempDir;

use super::*;

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Records invocations, then exits and prints according to substring rules.
#[derive(Default)]
struct FakeRunner {
    exits: Vec<(String, i32)>,
    prints: Vec<(String, String)>,
    calls: RefCell<Vec<Invocation>>,
}

impl FakeRunner {
    fn exit_with(&mut self, needle: &str, code: i32) {
        self.exits.push((needle.to_owned(), code));
    }

    fn print(&mut self, needle: &str, stdout: &str) {
        self.prints.push((needle.to_owned(), stdout.to_owned()));
    }

    fn invocations(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    fn commands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, invocation: &Invocation, _env: &EnvironmentContext) -> ExecutionOutcome {
        self.calls.borrow_mut().push(invocation.clone());
        let command = invocation.command_line();
        let code = self
            .exits
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map_or(0, |(_, code)| *code);
        let stdout = self
            .prints
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map_or("", |(_, text)| text.as_str());
        let stderr = if code == 0 { "" } else { "simulated failure" };
        ExecutionOutcome::new(command, stdout, stderr, code)
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

struct TestWorld {
    dir: TempDir,
    groups: Vec<Value>,
    installed: Vec<String>,
    write_plan: bool,
    config: Config,
    runner: FakeRunner,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<ExitCode>,
}

impl TestWorld {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temporary directory"),
            groups: Vec::new(),
            installed: Vec::new(),
            write_plan: true,
            config: Config::default(),
            runner: FakeRunner::default(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
        }
    }

    fn add_group(&mut self, name: &str, plugin: &str) {
        self.groups.push(json!({
            "name": name,
            "plugin": plugin,
            "build": format!("{name}/build_guest.py"),
            "artifacts": ["TestRuntime"],
            "test": { "kind": "unittest", "path": format!("{name}/test_guest.py") },
        }));
    }

    fn install(&mut self, plugin: &str) {
        self.installed.push(plugin.to_owned());
    }

    fn plan_path(&self) -> PathBuf {
        self.dir.path().join("bridgecheck.json")
    }

    fn install_root(&self) -> PathBuf {
        self.dir.path().join("install")
    }

    fn prepare(&mut self) {
        let install_root = self.install_root();
        fs::create_dir_all(&install_root).expect("create install root");
        for plugin in &self.installed {
            fs::create_dir_all(install_root.join(plugin)).expect("create plugin directory");
        }
        if self.write_plan {
            let document = json!({ "groups": self.groups });
            let text = serde_json::to_string_pretty(&document).expect("serialise plan");
            fs::write(self.plan_path(), text).expect("write plan");
        }
        let plan_path = self.plan_path();
        self.config.plan_path = plan_path.to_str().expect("utf8 temp path").to_owned().into();
    }

    fn run(&mut self, command: &str) {
        self.prepare();
        self.stdout.clear();
        self.stderr.clear();
        let env = EnvironmentContext::default()
            .with_var(bridgecheck_config::DEFAULT_INSTALL_ROOT_VAR, self.install_root());
        let loader = StaticConfigLoader {
            config: self.config.clone(),
        };
        let exit = run_with_loader(
            build_args(command),
            &mut self.stdout,
            &mut self.stderr,
            &loader,
            &self.runner,
            env,
        );
        self.exit_code = Some(exit);
    }

    fn stdout_text(&self) -> String {
        String::from_utf8(self.stdout.clone()).expect("stdout utf8")
    }

    fn stderr_text(&self) -> String {
        String::from_utf8(self.stderr.clone()).expect("stderr utf8")
    }
}

fn build_args(command: &str) -> Vec<OsString> {
    std::iter::once("bridgecheck")
        .chain(command.split_whitespace())
        .map(|token| OsString::from(token.trim_matches('"')))
        .collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[test]
fn skipped_groups_render_a_summary() {
    let mut world = TestWorld::new();
    world.add_group("alpha", "alpha");

    world.run("");

    assert_eq!(world.exit_code, Some(ExitCode::SUCCESS));
    assert_eq!(
        world.stdout_text(),
        "SKIPPED alpha (alpha)\n0 passed, 1 skipped, 0 failed\n"
    );
    assert!(world.runner.commands().is_empty());
}

#[test]
fn help_is_written_to_stdout() {
    let mut world = TestWorld::new();

    world.run("--help");

    assert_eq!(world.exit_code, Some(ExitCode::SUCCESS));
    assert!(world.stdout_text().contains("Usage: bridgecheck"));
    assert!(world.stderr_text().is_empty());
}

#[test]
fn unknown_subcommands_are_usage_errors() {
    let mut world = TestWorld::new();

    world.run("explode");

    assert_eq!(world.exit_code, Some(ExitCode::FAILURE));
    assert!(world.stderr_text().contains("explode"));
    assert!(world.runner.commands().is_empty());
}

#[test]
fn settings_follow_configuration() {
    let config = Config {
        interpreter: String::from("python3.11"),
        install_root_var: String::from("INTEROP_ROOT"),
        host_plugin: String::from("openjdk17"),
        guest_tag: String::from("Probe"),
        step_timeout_secs: Some(120),
        ..Config::default()
    };

    let settings = pipeline_settings(&config, Path::new("/suite"));

    assert_eq!(settings.archive_dir(), Path::new("/suite"));
    assert_eq!(settings.interpreter(), &OsString::from("python3.11"));
    assert_eq!(settings.install_root_var(), "INTEROP_ROOT");
    assert_eq!(settings.host_plugin(), "openjdk17");
    assert_eq!(settings.guest_tag(), "Probe");
    assert_eq!(settings.step_timeout(), Some(Duration::from_secs(120)));
}

#[test]
fn configured_timeout_reaches_every_invocation() {
    let mut world = TestWorld::new();
    world.add_group("beta", "beta");
    world.install("beta");
    world.config.step_timeout_secs = Some(30);
    world.config.interpreter = String::from("python3.12");

    world.run("run");

    assert_eq!(world.exit_code, Some(ExitCode::SUCCESS));
    let invocations = world.runner.invocations();
    assert_eq!(invocations.len(), 2);
    for invocation in &invocations {
        assert_eq!(invocation.program(), "python3.12");
        assert_eq!(invocation.timeout(), Some(Duration::from_secs(30)));
    }
}

#[test]
fn passing_step_output_is_printed_under_its_group() {
    let mut world = TestWorld::new();
    world.add_group("gamma", "gamma");
    world.install("gamma");
    world.runner.print("test_guest.py", "Ran 4 tests\n\nOK\n");

    world.run("run");

    assert_eq!(world.exit_code, Some(ExitCode::SUCCESS));
    let stdout = world.stdout_text();
    let status = stdout.find("PASSED  gamma (gamma)").expect("status line");
    let output = stdout.find("--- stdout ---\nRan 4 tests\n\nOK\n").expect("test output");
    assert!(status < output, "output follows its status line: {stdout}");
    assert!(stdout.ends_with("1 passed, 0 skipped, 0 failed\n"));
}
