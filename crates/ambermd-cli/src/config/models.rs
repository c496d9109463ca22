use ambermd::workflows::protocol::Protocol;
use std::path::PathBuf;

pub struct AppConfig {
    pub output_dir: PathBuf,
    pub protocol: Protocol,
}
