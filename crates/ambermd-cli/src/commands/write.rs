use crate::cli::WriteArgs;
use crate::config;
use crate::error::Result;
use tracing::info;

pub fn run(args: WriteArgs) -> Result<()> {
    info!("Building protocol from {:?}", &args.config);
    let app_config = config::build_write_config(&args)?;
    info!(
        "Protocol has {} stage(s); output directory {:?}",
        app_config.protocol.len(),
        &app_config.output_dir
    );
    super::write_protocol(app_config)
}
