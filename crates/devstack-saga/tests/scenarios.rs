//! End-to-end orchestration scenarios.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use devstack_saga::{
    FailurePolicy, FnStep, Orchestrator, PlanBuilder, RecordingLogger, Step, StepFailure,
    StepOutcome,
};

/// Stand-in for an external tool that can hang past its deadline.
struct SlowTool {
    calls: Cell<u32>,
    hang: bool,
}

#[derive(Debug, thiserror::Error)]
enum ToolError {
    #[error("timeout after {0:?} waiting for `docker exec solr-container solr create_core`")]
    Timeout(Duration),
}

impl SlowTool {
    fn invoke(&self, timeout: Duration) -> Result<String, ToolError> {
        self.calls.set(self.calls.get() + 1);
        if self.hang {
            Err(ToolError::Timeout(timeout))
        } else {
            Ok("core created".to_string())
        }
    }
}

struct CreateCoreStep;

impl Step<SlowTool> for CreateCoreStep {
    fn name(&self) -> &str {
        "create-core"
    }

    fn execute(&self, tool: &SlowTool) -> Result<String, StepFailure> {
        let output = tool
            .invoke(Duration::from_secs(30))
            .map_err(StepFailure::from_error)?;
        Ok(output)
    }
}

#[test]
fn non_critical_failure_between_critical_steps_under_auto_continue() -> anyhow::Result<()> {
    let plan = PlanBuilder::new()
        .first_step(FnStep::new("A", |_: &()| Ok("a".to_string())))
        .then(FnStep::new("B", |_: &()| Err(StepFailure::new("b failed"))).non_critical())
        .then(FnStep::new("C", |_: &()| Ok("c".to_string())))
        .build()?;

    let report = Orchestrator::new(FailurePolicy::AutoContinue).run(&plan, &());

    let outcomes: Vec<(&str, bool)> = report
        .steps()
        .iter()
        .map(|step| (step.name(), step.success()))
        .collect();
    assert_eq!(outcomes, vec![("A", true), ("B", false), ("C", true)]);
    assert!(!report.aborted());
    Ok(())
}

#[test]
fn critical_failure_compensates_previous_step_exactly_once() -> anyhow::Result<()> {
    for policy in [
        FailurePolicy::AutoAbort,
        FailurePolicy::AutoContinue,
        FailurePolicy::prompt(|_: &str, _: &str| true),
    ] {
        let compensations = RefCell::new(0);
        let plan = PlanBuilder::new()
            .first_step(
                FnStep::new("A", |_: &RefCell<u32>| Ok(String::new())).with_compensation(
                    "compensate A",
                    |count: &RefCell<u32>| {
                        *count.borrow_mut() += 1;
                        Ok(())
                    },
                ),
            )
            .then(FnStep::new("B", |_: &RefCell<u32>| {
                Err(StepFailure::new("B failed"))
            }))
            .build()?;

        let report = Orchestrator::new(policy).run(&plan, &compensations);

        assert!(report.aborted());
        assert!(
            report
                .abort_reason()
                .is_some_and(|reason| reason.contains('B'))
        );
        assert_eq!(*compensations.borrow(), 1);
    }
    Ok(())
}

#[test]
fn tool_timeout_surfaces_as_failed_step() -> anyhow::Result<()> {
    let tool = SlowTool {
        calls: Cell::new(0),
        hang: true,
    };
    let plan = PlanBuilder::new().first_step(CreateCoreStep).build()?;

    let report = Orchestrator::default().run(&plan, &tool);

    let result = &report.steps()[0];
    assert!(!result.success());
    assert!(result.message().contains("timeout"));
    assert!(matches!(result.outcome(), StepOutcome::Failed { .. }));
    assert_eq!(tool.calls.get(), 1);
    Ok(())
}

#[test]
fn responsive_tool_passes_detail_through() -> anyhow::Result<()> {
    let tool = SlowTool {
        calls: Cell::new(0),
        hang: false,
    };
    let plan = PlanBuilder::new().first_step(CreateCoreStep).build()?;

    let report = Orchestrator::default().run(&plan, &tool);

    assert!(report.succeeded());
    assert_eq!(report.steps()[0].message(), "core created");
    Ok(())
}

#[test]
fn total_duration_covers_every_step() -> anyhow::Result<()> {
    let plan = PlanBuilder::new()
        .first_step(FnStep::new("sleep", |_: &()| {
            std::thread::sleep(Duration::from_millis(20));
            Ok(String::new())
        }))
        .then(FnStep::new("fail", |_: &()| Err(StepFailure::new("nope"))))
        .build()?;

    let report = Orchestrator::default()
        .with_logger(RecordingLogger::new())
        .run(&plan, &());

    assert!(report.total_duration() >= Duration::from_millis(20));
    assert!(report.steps()[0].duration() >= Duration::from_millis(20));
    assert!(report.aborted());
    Ok(())
}
