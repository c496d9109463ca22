use super::protocol::Protocol;
use crate::core::models::system::SystemInfo;
use crate::engine::error::StageError;
use crate::engine::stage::Stage;
use crate::engine::stages::dynamics::{DynamicsSettings, DynamicsStage, NptStage, NvtStage};
use crate::engine::stages::minimization::MinimizationStage;
use std::sync::Arc;
use tracing::debug;

/// Production steps per nanosecond at a 2 fs time step.
pub const PRODUCTION_STEPS_PER_NS: u64 = 500_000;
pub const PRODUCTION_STAGE_NAME: &str = "Md";

#[derive(Debug, Clone, PartialEq)]
pub struct EquilibrationConfig {
    pub temperature: f64,
    pub production_ns: u64,
    /// Selection restrained during the early, strongly restrained stages.
    pub heavy_mask: String,
    /// Selection restrained during the late, weakly restrained stages.
    pub backbone_mask: String,
    /// Extra selection OR-ed into both masks, e.g. a bound ligand.
    pub extra_mask: Option<String>,
}

impl EquilibrationConfig {
    pub const DEFAULT_TEMPERATURE: f64 = 303.15;
    pub const DEFAULT_PRODUCTION_NS: u64 = 100;

    pub fn new(heavy_mask: impl Into<String>, backbone_mask: impl Into<String>) -> Self {
        Self {
            temperature: Self::DEFAULT_TEMPERATURE,
            production_ns: Self::DEFAULT_PRODUCTION_NS,
            heavy_mask: heavy_mask.into(),
            backbone_mask: backbone_mask.into(),
            extra_mask: None,
        }
    }

    fn with_extra(&self, mask: &str) -> String {
        match self.extra_mask.as_deref() {
            Some(extra) if !extra.is_empty() => format!("{}|{}", mask, extra),
            _ => mask.to_string(),
        }
    }

    pub fn effective_heavy_mask(&self) -> String {
        self.with_extra(&self.heavy_mask)
    }

    pub fn effective_backbone_mask(&self) -> String {
        self.with_extra(&self.backbone_mask)
    }
}

/// Builds the standard ten-stage preparation protocol.
///
/// Three restrained minimizations with decreasing force constants and one unrestrained
/// one bracket a restrained NVT heating. Four NPT stages then release the restraints
/// before the production run `Md`.
///
/// Fails if the production length does not fit into a step count.
pub fn build(
    system: Arc<dyn SystemInfo>,
    config: &EquilibrationConfig,
) -> Result<Protocol, StageError> {
    let production_steps = config
        .production_ns
        .checked_mul(PRODUCTION_STEPS_PER_NS)
        .ok_or_else(|| StageError::InvalidParameter {
            stage: PRODUCTION_STAGE_NAME.to_string(),
            parameter: "nstlim",
            reason: format!(
                "{} ns exceeds the largest representable step count",
                config.production_ns
            ),
        })?;
    let heavy = config.effective_heavy_mask();
    let backbone = config.effective_backbone_mask();
    let thermal = DynamicsSettings {
        temperature: config.temperature,
        ..DynamicsSettings::default()
    };
    debug!(
        "Building equilibration protocol: heavy={}, backbone={}",
        heavy, backbone
    );

    let mut protocol = Protocol::new();

    let mut step1 = MinimizationStage::new("step1", system.clone());
    step1.set_restraint(heavy.as_str(), 5.0);
    protocol.push(step1);

    let mut step2 = NvtStage::with_settings("step2", system.clone(), thermal);
    step2
        .set_steps(15_000)
        .set_thermostat_coupling(0.5)
        .set_restraint(heavy.as_str(), 5.0);
    protocol.push(step2);

    let mut step3 = MinimizationStage::new("step3", system.clone());
    step3.set_restraint(heavy.as_str(), 2.0);
    protocol.push(step3);

    let mut step4 = MinimizationStage::new("step4", system.clone());
    step4.set_restraint(backbone.as_str(), 0.1);
    protocol.push(step4);

    protocol.push(MinimizationStage::new("step5", system.clone()));

    let npt = |name: &str| {
        NptStage::with_settings(name, system.clone(), thermal, Default::default())
    };

    let mut step6 = npt("step6");
    step6.set_restraint(heavy.as_str(), 1.0);
    protocol.push(step6);

    let mut step7 = npt("step7");
    step7.set_restart(true).set_restraint(heavy.as_str(), 0.5);
    protocol.push(step7);

    let mut step8 = npt("step8");
    step8
        .set_restart(true)
        .set_steps(10_000)
        .set_restraint(backbone.as_str(), 0.5);
    protocol.push(step8);

    let mut step9 = npt("step9");
    step9
        .set_restart(true)
        .set_time_step(0.002)
        .set_com_removal_interval(1000);
    protocol.push(step9);

    let mut md = npt(PRODUCTION_STAGE_NAME);
    md.set_restart(true)
        .set_time_step(0.002)
        .set_com_removal_interval(1000)
        .set_steps(production_steps)
        .set_write_freq_trajectory(50_000);
    protocol.push(md);

    Ok(protocol)
}
