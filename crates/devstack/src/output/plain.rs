use std::fmt::Write as _;
use std::time::Duration;

use devstack_saga::{Plan, RollbackStatus, RunReport};
use devstack_steps::ToolVersion;

use super::ReportFormatter;

const MESSAGE_WIDTH: usize = 120;

pub(crate) struct PlainTextFormatter;

impl PlainTextFormatter {
    fn seconds(duration: Duration) -> String {
        format!("{:.1}s", duration.as_secs_f64())
    }

    /// Last non-empty line of a step message, clipped for one-line display.
    fn message_tail(message: &str) -> String {
        let line = message
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();
        if line.chars().count() > MESSAGE_WIDTH {
            let clipped: String = line.chars().take(MESSAGE_WIDTH).collect();
            format!("{clipped}...")
        } else {
            line.to_string()
        }
    }

    fn format_steps(output: &mut String, report: &RunReport) {
        for step in report.steps() {
            let status = if step.success() { "✓" } else { "✗" };
            let _ = write!(
                output,
                "{status} {} ({})",
                step.name(),
                Self::seconds(step.duration())
            );
            let tail = Self::message_tail(step.message());
            if !tail.is_empty() {
                let _ = write!(output, ": {tail}");
            }
            output.push('\n');
        }
    }

    fn format_rollback(output: &mut String, report: &RunReport) {
        if report.rollback().is_empty() {
            return;
        }
        output.push_str("\nRolled back:\n");
        for record in report.rollback() {
            match &record.status {
                RollbackStatus::Compensated => {
                    let _ = writeln!(
                        output,
                        "  ↩ {} ({}, {})",
                        record.name,
                        record.description,
                        Self::seconds(record.duration)
                    );
                }
                RollbackStatus::Failed { message } => {
                    let _ = writeln!(
                        output,
                        "  ⚠ {} ({}): {}",
                        record.name,
                        record.description,
                        Self::message_tail(message)
                    );
                }
            }
        }
    }

    fn format_warnings(output: &mut String, report: &RunReport) {
        if report.warnings().is_empty() {
            return;
        }
        output.push_str("\nWarnings:\n");
        for warning in report.warnings() {
            let _ = writeln!(output, "  {warning}");
        }
    }

    fn format_outcome(output: &mut String, report: &RunReport) {
        let total = Self::seconds(report.total_duration());
        let failed = report.failed_steps().len();
        output.push('\n');
        match report.abort() {
            Some(reason) => {
                let _ = writeln!(output, "Aborted after {total}: {reason}");
            }
            None if failed == 0 => {
                let _ = writeln!(
                    output,
                    "Provisioned {} steps in {total}",
                    report.steps().len()
                );
            }
            None => {
                let _ = writeln!(
                    output,
                    "Provisioned {} steps in {total} ({failed} non-critical failed)",
                    report.steps().len()
                );
            }
        }
    }
}

impl ReportFormatter for PlainTextFormatter {
    fn format_plan<Ctx: ?Sized>(&self, plan: &Plan<Ctx>) -> String {
        let mut output = format!("Provisioning plan ({} steps):\n", plan.len());
        for (index, step) in plan.steps().iter().enumerate() {
            let _ = write!(output, "{:>3}. {}", index + 1, step.name());
            if !step.is_critical() {
                output.push_str(" [non-critical]");
            }
            output.push('\n');
            if step.has_compensation() {
                let _ = writeln!(output, "       undo: {}", step.compensation_description());
            }
        }
        output
    }

    fn format_prerequisites(&self, tools: &[ToolVersion]) -> String {
        let mut output = String::from("Prerequisites:\n");
        for tool in tools {
            let _ = writeln!(output, "  ✓ {}: {}", tool.tool, tool.version);
        }
        output
    }

    fn format_report(&self, report: &RunReport) -> String {
        let mut output = String::new();
        Self::format_steps(&mut output, report);
        Self::format_rollback(&mut output, report);
        Self::format_warnings(&mut output, report);
        Self::format_outcome(&mut output, report);
        output
    }
}

#[cfg(test)]
mod tests {
    use devstack_saga::{FailurePolicy, FnStep, Orchestrator, PlanBuilder, StepFailure};

    use super::*;

    fn run(plan: &Plan<()>, policy: FailurePolicy) -> RunReport {
        Orchestrator::new(policy).run(plan, &())
    }

    fn network() -> FnStep<()> {
        FnStep::new("create network devnet", |_: &()| Ok(String::from("created devnet")))
            .with_compensation("remove network devnet", |_: &()| Ok(()))
    }

    fn failing(name: &str, message: &'static str) -> FnStep<()> {
        FnStep::new(name, move |_: &()| Err(StepFailure::new(message)))
    }

    #[test]
    fn plan_lists_steps_with_flags_and_undo() -> anyhow::Result<()> {
        let plan = PlanBuilder::new()
            .first_step(network())
            .then(
                FnStep::new("resolve frontend release", |_: &()| Ok(String::new())).non_critical(),
            )
            .build()?;

        let output = PlainTextFormatter.format_plan(&plan);

        assert_eq!(
            output,
            "Provisioning plan (2 steps):\n  \
             1. create network devnet\n       \
             undo: remove network devnet\n  \
             2. resolve frontend release [non-critical]\n"
        );
        Ok(())
    }

    #[test]
    fn prerequisites_list_versions() {
        let output = PlainTextFormatter.format_prerequisites(&[ToolVersion {
            tool: String::from("docker"),
            version: String::from("Docker version 27.1.1"),
        }]);

        assert!(output.contains("✓ docker: Docker version 27.1.1"));
    }

    #[test]
    fn successful_run_reports_every_step() -> anyhow::Result<()> {
        let plan = PlanBuilder::new().first_step(network()).build()?;

        let output = PlainTextFormatter.format_report(&run(&plan, FailurePolicy::AutoAbort));

        assert!(output.starts_with("✓ create network devnet ("));
        assert!(output.contains("): created devnet\n"));
        assert!(output.contains("Provisioned 1 steps in"));
        assert!(!output.contains("Rolled back"));
        assert!(!output.contains("Warnings"));
        Ok(())
    }

    #[test]
    fn aborted_run_shows_failure_rollback_and_reason() -> anyhow::Result<()> {
        let plan = PlanBuilder::new()
            .first_step(network())
            .then(failing("create core jobs", "exit code 1:\nERROR: core jobs exists\n"))
            .build()?;

        let output = PlainTextFormatter.format_report(&run(&plan, FailurePolicy::AutoAbort));

        assert!(output.contains("✗ create core jobs ("));
        assert!(output.contains("): ERROR: core jobs exists\n"));
        assert!(output.contains("Rolled back:\n  ↩ create network devnet (remove network"));
        assert!(output.contains("Aborted after "));
        assert!(output.contains(": critical step failed: create core jobs\n"));
        Ok(())
    }

    #[test]
    fn failed_compensation_is_listed_as_warning() -> anyhow::Result<()> {
        let container = FnStep::new("start container solr", |_: &()| Ok(String::new()))
            .with_compensation("stop and remove solr", |_: &()| {
                Err(StepFailure::new("daemon not running"))
            });
        let plan = PlanBuilder::new()
            .first_step(container)
            .then(failing("wait for solr", "timeout"))
            .build()?;

        let output = PlainTextFormatter.format_report(&run(&plan, FailurePolicy::AutoAbort));

        assert!(output.contains("  ⚠ start container solr (stop and remove solr): daemon not"));
        assert!(output.contains("Warnings:\n  rollback of 'start container solr' failed"));
        Ok(())
    }

    #[test]
    fn non_critical_failures_are_counted_when_continuing() -> anyhow::Result<()> {
        let plan = PlanBuilder::new()
            .first_step(failing("configure schema jobs", "HTTP 400").non_critical())
            .then(network())
            .build()?;

        let output = PlainTextFormatter.format_report(&run(&plan, FailurePolicy::AutoContinue));

        assert!(output.contains("Provisioned 2 steps in"));
        assert!(output.contains("(1 non-critical failed)"));
        Ok(())
    }

    #[test]
    fn long_messages_are_clipped() {
        let long = "x".repeat(MESSAGE_WIDTH + 10);

        let tail = PlainTextFormatter::message_tail(&format!("first\n{long}\n\n"));

        assert_eq!(tail.len(), MESSAGE_WIDTH + 3);
        assert!(tail.ends_with("..."));
    }
}
