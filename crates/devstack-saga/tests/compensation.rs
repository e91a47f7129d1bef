//! Integration tests for rollback ordering.

use std::cell::RefCell;

use devstack_saga::{
    FailurePolicy, Orchestrator, Plan, PlanBuilder, RollbackRegistry, Step, StepFailure,
};

struct TestContext {
    log: RefCell<Vec<String>>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            log: RefCell::new(Vec::new()),
        }
    }

    fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

struct TrackedStep {
    name: String,
}

impl TrackedStep {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Step<TestContext> for TrackedStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, ctx: &TestContext) -> Result<String, StepFailure> {
        ctx.log.borrow_mut().push(format!("execute {}", self.name));
        Ok(String::new())
    }

    fn has_compensation(&self) -> bool {
        true
    }

    fn compensate(&self, ctx: &TestContext) -> Result<(), StepFailure> {
        ctx.log.borrow_mut().push(format!("compensate {}", self.name));
        Ok(())
    }
}

struct ReadOnlyStep {
    name: &'static str,
}

impl Step<TestContext> for ReadOnlyStep {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, ctx: &TestContext) -> Result<String, StepFailure> {
        ctx.log.borrow_mut().push(format!("execute {}", self.name));
        Ok(String::new())
    }
}

struct FailingStep;

impl Step<TestContext> for FailingStep {
    fn name(&self) -> &str {
        "failing"
    }

    fn execute(&self, ctx: &TestContext) -> Result<String, StepFailure> {
        ctx.log.borrow_mut().push("execute failing".to_string());
        Err(StepFailure::new("exit code 125"))
    }
}

#[test]
fn read_only_steps_have_no_op_compensation() -> anyhow::Result<()> {
    let ctx = TestContext::new();
    let plan = PlanBuilder::new()
        .first_step(TrackedStep::new("tracked"))
        .then(ReadOnlyStep { name: "read_only" })
        .then(FailingStep)
        .build()?;

    let report = Orchestrator::default().run(&plan, &ctx);

    assert!(report.aborted());
    assert_eq!(
        ctx.entries(),
        vec![
            "execute tracked",
            "execute read_only",
            "execute failing",
            "compensate tracked"
        ]
    );
    assert_eq!(report.rollback().len(), 1);
    Ok(())
}

#[test]
fn mixed_compensation_and_read_only_steps() -> anyhow::Result<()> {
    let ctx = TestContext::new();
    let plan = PlanBuilder::new()
        .first_step(TrackedStep::new("tracked_1"))
        .then(ReadOnlyStep {
            name: "read_only_1",
        })
        .then(TrackedStep::new("tracked_2"))
        .then(ReadOnlyStep {
            name: "read_only_2",
        })
        .then(TrackedStep::new("tracked_3"))
        .then(FailingStep)
        .build()?;

    Orchestrator::default().run(&plan, &ctx);

    let compensations: Vec<String> = ctx
        .entries()
        .into_iter()
        .filter(|entry| entry.starts_with("compensate"))
        .collect();
    assert_eq!(
        compensations,
        vec![
            "compensate tracked_3",
            "compensate tracked_2",
            "compensate tracked_1"
        ]
    );
    Ok(())
}

#[test]
fn first_step_failure_triggers_no_compensation() -> anyhow::Result<()> {
    let ctx = TestContext::new();
    let plan = PlanBuilder::new()
        .first_step(FailingStep)
        .then(TrackedStep::new("never"))
        .build()?;

    let report = Orchestrator::default().run(&plan, &ctx);

    assert!(report.aborted());
    assert!(report.rollback().is_empty());
    assert_eq!(ctx.entries(), vec!["execute failing"]);
    Ok(())
}

#[test]
fn critical_failure_at_any_index_stops_and_unwinds_prefix() -> anyhow::Result<()> {
    for fail_at in 0..5 {
        let ctx = TestContext::new();
        let mut steps: Vec<Box<dyn Step<TestContext>>> = Vec::new();
        for index in 0..5 {
            if index == fail_at {
                steps.push(Box::new(FailingStep));
            } else {
                steps.push(Box::new(TrackedStep::new(&format!("step_{index}"))));
            }
        }
        let plan = Plan::from_steps(steps)?;

        let report = Orchestrator::new(FailurePolicy::AutoContinue).run(&plan, &ctx);

        let mut expected: Vec<String> =
            (0..fail_at).map(|i| format!("execute step_{i}")).collect();
        expected.push("execute failing".to_string());
        expected.extend((0..fail_at).rev().map(|i| format!("compensate step_{i}")));
        assert_eq!(ctx.entries(), expected, "failure at index {fail_at}");
        assert_eq!(report.steps().len(), fail_at + 1);
        assert!(report.aborted());
    }
    Ok(())
}

#[test]
fn registry_drains_in_reverse_when_used_directly() {
    let ctx = TestContext::new();
    let mut registry = RollbackRegistry::new();

    for name in ["network", "apache", "solr"] {
        registry.register(name, format!("remove {name}"), move |ctx: &TestContext| {
            ctx.log.borrow_mut().push(format!("remove {name}"));
            Ok(())
        });
    }
    let records = registry.drain_reverse(&ctx);

    assert_eq!(
        ctx.entries(),
        vec!["remove solr", "remove apache", "remove network"]
    );
    assert_eq!(records.len(), 3);
    assert!(registry.is_empty());
    assert!(registry.drain_reverse(&ctx).is_empty());
}
