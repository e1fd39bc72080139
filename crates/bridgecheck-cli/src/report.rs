//! Plain-text rendering of plans, run reports, and faults.

use std::io::{self, Write};

use bridgecheck_pipeline::{
    ExecutionOutcome, GroupStatus, PipelineError, Plan, PluginProbe, RunReport, ScriptMode, Step,
};

/// Writes one status line per evaluated group, the output its passing steps
/// printed, and a summary line.
pub(crate) fn write_run_report<W: Write>(report: &RunReport, out: &mut W) -> io::Result<()> {
    for group in report.groups() {
        writeln!(
            out,
            "{:<7} {} ({})",
            group.status().as_str(),
            group.name(),
            group.plugin()
        )?;
        for outcome in group.outputs() {
            write_step_output(out, outcome)?;
        }
        if group.cleanup_failures() > 0 {
            writeln!(
                out,
                "        {} generated file(s) could not be removed",
                group.cleanup_failures()
            )?;
        }
    }
    writeln!(
        out,
        "{} passed, {} skipped, {} failed",
        report.count(GroupStatus::Passed),
        report.count(GroupStatus::Skipped),
        report.count(GroupStatus::Failed)
    )?;
    out.flush()
}

/// Writes the fault and whatever the failing child printed.
pub(crate) fn write_failure<W: Write>(error: &PipelineError, out: &mut W) -> io::Result<()> {
    writeln!(out, "{} fault: {error}", error.kind())?;
    if let Some(outcome) = error.outcome() {
        if let Some(cause) = outcome.cause() {
            writeln!(out, "cause: {cause}")?;
        }
        write_stream(out, "stdout", outcome.stdout())?;
        write_stream(out, "stderr", outcome.stderr())?;
    }
    out.flush()
}

fn write_step_output<W: Write>(out: &mut W, outcome: &ExecutionOutcome) -> io::Result<()> {
    if outcome.stdout().is_empty() && outcome.stderr().is_empty() {
        return Ok(());
    }
    writeln!(out, "$ {}", outcome.command())?;
    write_stream(out, "stdout", outcome.stdout())?;
    write_stream(out, "stderr", outcome.stderr())
}

fn write_stream<W: Write>(out: &mut W, label: &str, text: &str) -> io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    writeln!(out, "--- {label} ---")?;
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}

/// Lists every group with its plugin, availability, and test kind.
pub(crate) fn write_plan<W, P>(plan: &Plan, probe: &P, out: &mut W) -> io::Result<()>
where
    W: Write,
    P: PluginProbe,
{
    for group in plan.groups() {
        let availability = if probe.is_available(group.plugin()) {
            "installed"
        } else {
            "missing"
        };
        writeln!(
            out,
            "{} ({}): {availability}, {}",
            group.name(),
            group.plugin(),
            test_kind(group.test())
        )?;
    }
    out.flush()
}

const fn test_kind(step: &Step) -> &'static str {
    match step {
        Step::Script(script) => match script.mode() {
            ScriptMode::Plain => "script",
            ScriptMode::UnitTest => "unittest",
        },
        Step::CompiledSuite(_) => "compiled suite",
    }
}
