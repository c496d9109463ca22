use crate::error::{CliError, Result};
use ambermd::core::models::system::SystemSummary;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSystemConfig {
    pub protein: Option<usize>,
    pub dna: Option<usize>,
    pub rna: Option<usize>,
    pub lipid: Option<usize>,
    pub carbohydrate: Option<usize>,
    pub charmm_water: Option<bool>,
}

impl From<FileSystemConfig> for SystemSummary {
    fn from(p: FileSystemConfig) -> Self {
        Self {
            protein: p.protein.unwrap_or(0),
            dna: p.dna.unwrap_or(0),
            rna: p.rna.unwrap_or(0),
            lipid: p.lipid.unwrap_or(0),
            carbohydrate: p.carbohydrate.unwrap_or(0),
            charmm_water: p.charmm_water.unwrap_or(false),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileStageKind {
    Minimization,
    Nvt,
    Npt,
}

/// One `[[stage]]` table. Only the fields relevant to `type` may be present.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileStageConfig {
    #[serde(rename = "type")]
    pub kind: FileStageKind,
    pub name: String,

    pub cutoff: Option<f64>,
    pub restraint_mask: Option<String>,
    pub restraint_weight: Option<f64>,
    pub charmm_water: Option<bool>,
    pub write_freq_trajectory: Option<u32>,
    pub write_freq_energy: Option<u32>,
    pub write_freq_restart: Option<u32>,

    // Minimization
    pub min_trust_region_steps: Option<u32>,
    pub max_cycles: Option<u32>,
    pub conjugate_gradient_start_cycle: Option<u32>,

    // Dynamics
    pub steps: Option<u64>,
    pub time_step: Option<f64>,
    pub temperature: Option<f64>,
    pub thermostat_coupling: Option<f64>,
    pub restart: Option<bool>,
    pub com_removal_interval: Option<u32>,

    // NPT
    pub pressure: Option<f64>,
    pub pressure_relaxation_time: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub system: Option<FileSystemConfig>,
    #[serde(default, rename = "stage")]
    pub stages: Vec<FileStageConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading protocol from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
