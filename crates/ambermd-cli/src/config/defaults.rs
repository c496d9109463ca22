use ambermd::workflows::equilibration::EquilibrationConfig;
use std::path::PathBuf;

pub struct DefaultsConfig {
    pub output_dir: PathBuf,
    pub temperature: f64,
    pub production_ns: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            temperature: EquilibrationConfig::DEFAULT_TEMPERATURE,
            production_ns: EquilibrationConfig::DEFAULT_PRODUCTION_NS,
        }
    }
}
