pub mod equil;
pub mod write;

use crate::config::AppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use ambermd::engine::progress::ProgressReporter;
use ambermd::workflows::protocol;
use tracing::info;

/// Writes a resolved protocol and prints where each input file went.
fn write_protocol(config: AppConfig) -> Result<()> {
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the protocol workflow...");
    let written = protocol::run(&config.protocol, &config.output_dir, &reporter)?;

    println!("Wrote {} input file(s):", written.len());
    for path in &written {
        println!("  {}", path.display());
    }
    Ok(())
}
