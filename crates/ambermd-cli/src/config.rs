mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{build_equilibration_config, build_write_config};
pub use models::AppConfig;
