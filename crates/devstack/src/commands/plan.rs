use devstack_steps::{DevstackConfig, plan_from_config};

use crate::error::Result;
use crate::output::{PlainTextFormatter, ReportFormatter};

pub(crate) fn run(config: &DevstackConfig) -> Result<()> {
    let plan = plan_from_config(config)?;
    print!("{}", PlainTextFormatter.format_plan(&plan));
    Ok(())
}
