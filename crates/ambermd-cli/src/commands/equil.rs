use crate::cli::EquilArgs;
use crate::config;
use crate::error::Result;
use tracing::info;

pub fn run(args: EquilArgs) -> Result<()> {
    info!("Building the standard equilibration protocol.");
    let app_config = config::build_equilibration_config(&args)?;
    super::write_protocol(app_config)
}
