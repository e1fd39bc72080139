//! Crate-level test doubles, fixtures, and BDD tests.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use mockall::mock;
use tempfile::TempDir;

use crate::availability::PluginProbe;
use crate::context::PipelineSettings;
use crate::environment::EnvironmentContext;
use crate::plan::{CompiledSuiteStep, ScriptMode, ScriptStep, Step, StepGroup};
use crate::process::{ExecutionOutcome, Invocation, ProcessRunner};
use crate::suite::{HAMCREST_ARCHIVE, JUNIT_CONSOLE_ARCHIVE};


mock! {
    pub Runner {}
    impl ProcessRunner for Runner {
        fn run(&self, invocation: &Invocation, env: &EnvironmentContext) -> ExecutionOutcome;
    }
}

// ---------------------------------------------------------------------------
// Scripted runner
// ---------------------------------------------------------------------------

/// Records every invocation and answers with scripted exit statuses.
///
/// The first exit rule whose needle occurs in the command line decides the
/// status; unmatched commands exit zero. Every matching file rule creates its
/// files, which stands in for a tool writing artifacts next to its sources.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    exits: Vec<(String, i32)>,
    creates: Vec<(String, PathBuf)>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Commands containing `needle` exit with `exit_code`.
    pub(crate) fn exits(mut self, needle: &str, exit_code: i32) -> Self {
        self.exits.push((needle.to_owned(), exit_code));
        self
    }

    /// Commands containing `needle` create `file` before exiting.
    pub(crate) fn creating(mut self, needle: &str, file: impl Into<PathBuf>) -> Self {
        self.creates.push((needle.to_owned(), file.into()));
        self
    }

    /// Returns the command lines issued so far, in order.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    /// Returns the invocations issued so far, in order.
    pub(crate) fn invocations(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Returns `true` when any issued command line contains `needle`.
    pub(crate) fn ran(&self, needle: &str) -> bool {
        self.commands().iter().any(|command| command.contains(needle))
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation, _env: &EnvironmentContext) -> ExecutionOutcome {
        self.calls.borrow_mut().push(invocation.clone());
        let command = invocation.command_line();
        for (needle, file) in &self.creates {
            if command.contains(needle.as_str()) {
                fs::write(file, b"\x7fELF").expect("create scripted file");
            }
        }
        let exit_code = self
            .exits
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map_or(0, |(_, code)| *code);
        let stderr = if exit_code == 0 {
            String::new()
        } else {
            format!("{command}: exited with {exit_code}")
        };
        ExecutionOutcome::new(command, "scripted output\n", stderr, exit_code)
    }
}

// ---------------------------------------------------------------------------
// Plugin probe
// ---------------------------------------------------------------------------

/// Probe answering from a fixed list of installed plugin names.
#[derive(Debug, Default, Clone)]
pub(crate) struct StaticProbe {
    installed: Vec<String>,
}

impl StaticProbe {
    pub(crate) fn with(plugins: &[&str]) -> Self {
        Self {
            installed: plugins.iter().map(|plugin| (*plugin).to_owned()).collect(),
        }
    }
}

impl PluginProbe for StaticProbe {
    fn is_available(&self, plugin_name: &str) -> bool {
        self.installed.iter().any(|plugin| plugin == plugin_name)
    }
}

// ---------------------------------------------------------------------------
// Suite workspace
// ---------------------------------------------------------------------------

/// Temporary plan directory holding the fixed archives and an install root.
pub(crate) struct SuiteWorkspace {
    dir: TempDir,
}

impl SuiteWorkspace {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().expect("create workspace");
        fs::write(dir.path().join(JUNIT_CONSOLE_ARCHIVE), b"jar").expect("write junit");
        fs::write(dir.path().join(HAMCREST_ARCHIVE), b"jar").expect("write hamcrest");
        fs::create_dir_all(dir.path().join("install").join("openjdk")).expect("create host");
        Self { dir }
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn install_root(&self) -> PathBuf {
        self.root().join("install")
    }

    pub(crate) fn env(&self) -> EnvironmentContext {
        EnvironmentContext::default().with_var("METAFFI_HOME", self.install_root())
    }

    pub(crate) fn settings(&self) -> PipelineSettings {
        PipelineSettings::new(self.root()).with_interpreter("python3")
    }

    /// Creates `<root>/<name>/` and returns a group that builds there and
    /// tests through a compiled suite named `APITest<Name>`.
    pub(crate) fn compiled_group(&self, name: &str, plugin: &str) -> StepGroup {
        let directory = self.root().join(name);
        fs::create_dir_all(&directory).expect("create group dir");
        let suite = CompiledSuiteStep::new(directory.join(format!("APITest{}.java", title(name))))
            .expect("suite step");
        StepGroup::new(name, plugin, Step::CompiledSuite(suite))
            .with_build(directory.join("build_guest.py"))
            .with_artifact("TestRuntime")
    }

    /// Creates `<root>/<name>/` and returns a group that builds there and
    /// tests through a unit-test script.
    pub(crate) fn script_group(&self, name: &str, plugin: &str) -> StepGroup {
        let directory = self.root().join(name);
        fs::create_dir_all(&directory).expect("create group dir");
        let test = ScriptStep::new(directory.join("test_guest.py"), ScriptMode::UnitTest);
        StepGroup::new(name, plugin, Step::Script(test))
            .with_build(directory.join("build_guest.py"))
            .with_artifact("TestRuntime")
    }
}

fn title(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
