use devstack_gateway::SystemGateway;
use devstack_steps::{DevstackConfig, check_prerequisites};

use crate::error::Result;
use crate::output::{PlainTextFormatter, ReportFormatter};

pub(crate) fn run(config: &DevstackConfig) -> Result<()> {
    let gateway = SystemGateway::new()?;
    let tools = check_prerequisites(&gateway, config)?;
    print!("{}", PlainTextFormatter.format_prerequisites(&tools));
    Ok(())
}
