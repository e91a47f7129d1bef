use devstack_saga::{Plan, RunReport};
use devstack_steps::ToolVersion;

pub(crate) trait ReportFormatter {
    fn format_plan<Ctx: ?Sized>(&self, plan: &Plan<Ctx>) -> String;
    fn format_prerequisites(&self, tools: &[ToolVersion]) -> String;
    fn format_report(&self, report: &RunReport) -> String;
}
