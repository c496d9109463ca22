use crate::core::io::namelist::NamelistWriter;
use crate::core::models::system::SystemInfo;
use crate::engine::error::StageError;
use crate::engine::stage::{Stage, StageParams, WriteFrequencies, ensure};
use std::io::{self, Write};
use std::sync::Arc;

/// Integration and thermostat settings shared by NVT and NPT stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsSettings {
    /// Number of MD steps (`nstlim`).
    pub steps: u64,
    /// Time step in picoseconds (`dt`).
    pub time_step: f64,
    /// Target temperature in kelvin (`temp0`).
    pub temperature: f64,
    /// Berendsen thermostat coupling constant in picoseconds (`tautp`).
    pub thermostat_coupling: f64,
    /// Continue from restart velocities (`irest`).
    pub restart: bool,
    /// Steps between centre-of-mass motion removal (`nscm`).
    pub com_removal_interval: u32,
}

impl Default for DynamicsSettings {
    fn default() -> Self {
        Self {
            steps: 5000,
            time_step: 0.001,
            temperature: 303.15,
            thermostat_coupling: 1.0,
            restart: false,
            com_removal_interval: 1000,
        }
    }
}

/// Berendsen barostat settings of an NPT stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarostatSettings {
    /// Reference pressure in bar (`pres0`).
    pub pressure: f64,
    /// Pressure relaxation time in picoseconds (`taup`).
    pub relaxation_time: f64,
}

impl Default for BarostatSettings {
    fn default() -> Self {
        Self {
            pressure: 1.0,
            relaxation_time: 2.0,
        }
    }
}

/// Default output cadence of dynamics stages.
pub const DYNAMICS_WRITE_FREQUENCIES: WriteFrequencies = WriteFrequencies::new(500, 500, 5000);

const OUTPUT_FORMAT: u8 = 1;
const RESTART_FORMAT: u8 = 2;
// SHAKE on bonds to hydrogen, and their forces omitted.
const SHAKE_HYDROGENS: u8 = 2;
const BERENDSEN: u8 = 1;
const ISOTROPIC_SCALING: u8 = 1;
const CONSTANT_VOLUME: u8 = 1;
const CONSTANT_PRESSURE: u8 = 2;

/// Behaviour common to stages that integrate equations of motion.
pub trait DynamicsStage: Stage {
    fn dynamics(&self) -> &DynamicsSettings;
    fn dynamics_mut(&mut self) -> &mut DynamicsSettings;

    fn set_steps(&mut self, steps: u64) -> &mut Self
    where
        Self: Sized,
    {
        self.dynamics_mut().steps = steps;
        self
    }

    fn set_time_step(&mut self, time_step: f64) -> &mut Self
    where
        Self: Sized,
    {
        self.dynamics_mut().time_step = time_step;
        self
    }

    fn set_temperature(&mut self, temperature: f64) -> &mut Self
    where
        Self: Sized,
    {
        self.dynamics_mut().temperature = temperature;
        self
    }

    fn set_thermostat_coupling(&mut self, tautp: f64) -> &mut Self
    where
        Self: Sized,
    {
        self.dynamics_mut().thermostat_coupling = tautp;
        self
    }

    fn set_restart(&mut self, restart: bool) -> &mut Self
    where
        Self: Sized,
    {
        self.dynamics_mut().restart = restart;
        self
    }

    fn set_com_removal_interval(&mut self, steps: u32) -> &mut Self
    where
        Self: Sized,
    {
        self.dynamics_mut().com_removal_interval = steps;
        self
    }
}

fn validate_dynamics(params: &StageParams, dynamics: &DynamicsSettings) -> Result<(), StageError> {
    params.validate()?;
    ensure(params, "nstlim", dynamics.steps > 0, "must be at least one step")?;
    ensure(
        params,
        "dt",
        dynamics.time_step.is_finite() && dynamics.time_step > 0.0,
        "must be a positive time step in picoseconds",
    )?;
    ensure(
        params,
        "temp0",
        dynamics.temperature.is_finite() && dynamics.temperature >= 0.0,
        "must be a non-negative temperature in kelvin",
    )?;
    ensure(
        params,
        "tautp",
        dynamics.thermostat_coupling.is_finite() && dynamics.thermostat_coupling > 0.0,
        "must be a positive coupling time",
    )?;
    ensure(
        params,
        "nscm",
        dynamics.com_removal_interval > 0,
        "must be at least one step",
    )
}

fn write_dynamics_fields(
    out: &mut dyn Write,
    params: &StageParams,
    dynamics: &DynamicsSettings,
    barostat: Option<&BarostatSettings>,
) -> io::Result<()> {
    let freq = params.write_frequencies;
    let mut nml = NamelistWriter::new(out);
    nml.int("imin", 0)?
        .flag("irest", dynamics.restart)?
        .int("ntx", if dynamics.restart { 5 } else { 1 })?
        .raw("nstlim", dynamics.steps)?
        .real("dt", dynamics.time_step)?
        .int("ntc", SHAKE_HYDROGENS)?
        .int("ntf", SHAKE_HYDROGENS)?
        .real("cut", params.cutoff)?
        .int(
            "ntb",
            if barostat.is_some() {
                CONSTANT_PRESSURE
            } else {
                CONSTANT_VOLUME
            },
        )?
        .int("ntt", BERENDSEN)?
        .real("tautp", dynamics.thermostat_coupling)?;
    if !dynamics.restart {
        nml.real("tempi", dynamics.temperature)?;
    }
    nml.real("temp0", dynamics.temperature)?;
    if let Some(barostat) = barostat {
        nml.int("ntp", ISOTROPIC_SCALING)?
            .int("barostat", BERENDSEN)?
            .real("pres0", barostat.pressure)?
            .real("taup", barostat.relaxation_time)?;
    }
    nml.int("nscm", dynamics.com_removal_interval)?
        .int("ntpr", freq.energy)?
        .int("ntwx", freq.trajectory)?
        .int("ntwr", freq.restart)?
        .int("ioutfm", OUTPUT_FORMAT)?
        .int("ntxo", RESTART_FORMAT)?;
    Ok(())
}

/// Constant-volume, constant-temperature dynamics.
#[derive(Debug, Clone)]
pub struct NvtStage {
    params: StageParams,
    dynamics: DynamicsSettings,
}

impl NvtStage {
    pub fn new(name: impl Into<String>, system: Arc<dyn SystemInfo>) -> Self {
        Self::with_settings(name, system, DynamicsSettings::default())
    }

    pub fn with_settings(
        name: impl Into<String>,
        system: Arc<dyn SystemInfo>,
        dynamics: DynamicsSettings,
    ) -> Self {
        let mut params = StageParams::new(name, system);
        params.write_frequencies = DYNAMICS_WRITE_FREQUENCIES;
        Self { params, dynamics }
    }
}

impl Stage for NvtStage {
    fn params(&self) -> &StageParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut StageParams {
        &mut self.params
    }

    fn title(&self) -> &'static str {
        "NVT"
    }

    fn validate(&self) -> Result<(), StageError> {
        validate_dynamics(&self.params, &self.dynamics)
    }

    fn write_stage_fields(&self, out: &mut dyn Write) -> io::Result<()> {
        write_dynamics_fields(out, &self.params, &self.dynamics, None)
    }
}

impl DynamicsStage for NvtStage {
    fn dynamics(&self) -> &DynamicsSettings {
        &self.dynamics
    }

    fn dynamics_mut(&mut self) -> &mut DynamicsSettings {
        &mut self.dynamics
    }
}

/// Constant-pressure, constant-temperature dynamics.
#[derive(Debug, Clone)]
pub struct NptStage {
    params: StageParams,
    dynamics: DynamicsSettings,
    barostat: BarostatSettings,
}

impl NptStage {
    pub fn new(name: impl Into<String>, system: Arc<dyn SystemInfo>) -> Self {
        Self::with_settings(
            name,
            system,
            DynamicsSettings::default(),
            BarostatSettings::default(),
        )
    }

    pub fn with_settings(
        name: impl Into<String>,
        system: Arc<dyn SystemInfo>,
        dynamics: DynamicsSettings,
        barostat: BarostatSettings,
    ) -> Self {
        let mut params = StageParams::new(name, system);
        params.write_frequencies = DYNAMICS_WRITE_FREQUENCIES;
        Self {
            params,
            dynamics,
            barostat,
        }
    }

    pub fn barostat(&self) -> &BarostatSettings {
        &self.barostat
    }

    pub fn set_pressure(&mut self, pressure: f64) -> &mut Self {
        self.barostat.pressure = pressure;
        self
    }

    pub fn set_pressure_relaxation_time(&mut self, taup: f64) -> &mut Self {
        self.barostat.relaxation_time = taup;
        self
    }
}

impl Stage for NptStage {
    fn params(&self) -> &StageParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut StageParams {
        &mut self.params
    }

    fn title(&self) -> &'static str {
        "NPT"
    }

    fn validate(&self) -> Result<(), StageError> {
        validate_dynamics(&self.params, &self.dynamics)?;
        ensure(
            &self.params,
            "pres0",
            self.barostat.pressure.is_finite() && self.barostat.pressure > 0.0,
            "must be a positive pressure in bar",
        )?;
        ensure(
            &self.params,
            "taup",
            self.barostat.relaxation_time.is_finite() && self.barostat.relaxation_time > 0.0,
            "must be a positive relaxation time",
        )
    }

    fn write_stage_fields(&self, out: &mut dyn Write) -> io::Result<()> {
        write_dynamics_fields(out, &self.params, &self.dynamics, Some(&self.barostat))
    }
}

impl DynamicsStage for NptStage {
    fn dynamics(&self) -> &DynamicsSettings {
        &self.dynamics
    }

    fn dynamics_mut(&mut self) -> &mut DynamicsSettings {
        &mut self.dynamics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::system::SystemSummary;

    fn system() -> Arc<dyn SystemInfo> {
        Arc::new(SystemSummary::protein_only(200))
    }

    #[test]
    fn nvt_heating_body_has_expected_fields_in_order() {
        let stage = NvtStage::new("step2", system());
        let expected = "\
NVT: step2
&cntrl
imin=0,
irest=0,
ntx=1,
nstlim=5000,
dt=0.001,
ntc=2,
ntf=2,
cut=8.0,
ntb=1,
ntt=1,
tautp=1.0,
tempi=303.15,
temp0=303.15,
nscm=1000,
ntpr=500,
ntwx=500,
ntwr=5000,
ioutfm=1,
ntxo=2,
ntr=0
&end
";
        assert_eq!(stage.render().unwrap(), expected);
    }

    #[test]
    fn restarted_npt_reads_velocities_and_skips_initial_temperature() {
        let mut stage = NptStage::new("step7", system());
        stage.set_restart(true).set_temperature(310.0);

        let text = stage.render().unwrap();
        assert!(text.starts_with("NPT: step7\n&cntrl\n"));
        assert!(text.contains("irest=1,\nntx=5,\n"));
        assert!(!text.contains("tempi="));
        assert!(text.contains(
            "ntb=2,\nntt=1,\ntautp=1.0,\ntemp0=310.0,\nntp=1,\nbarostat=1,\npres0=1.0,\ntaup=2.0,\n"
        ));
    }

    #[test]
    fn dynamics_setters_chain_with_base_setters() {
        let mut stage = NptStage::new("md", system());
        stage
            .set_steps(50_000_000)
            .set_time_step(0.002)
            .set_write_freq_trajectory(50_000)
            .set_com_removal_interval(1000);
        stage.set_pressure(1.01325).set_pressure_relaxation_time(1.0);

        let text = stage.render().unwrap();
        assert!(text.contains("nstlim=50000000,\ndt=0.002,\n"));
        assert!(text.contains("ntwx=50000,\n"));
        assert!(text.contains("pres0=1.01325,\ntaup=1.0,\n"));
    }

    #[test]
    fn restraint_block_follows_dynamics_fields() {
        let mut stage = NvtStage::new("step2", system());
        stage.set_restraint("@CA", 5.0).set_thermostat_coupling(0.5);

        let text = stage.render().unwrap();
        assert!(text.contains("tautp=0.5,\n"));
        assert!(text.ends_with(
            "ntxo=2,\nntr=1,\nrestraintmask=\":1-200&!@H=|:@CA\",\nrestraint_wt=5.0,\n&end\n"
        ));
    }

    #[test]
    fn invalid_dynamics_parameters_are_rejected() {
        let mut stage = NvtStage::new("bad", system());
        stage.set_time_step(0.0);
        assert!(matches!(
            stage.validate(),
            Err(StageError::InvalidParameter { parameter: "dt", .. })
        ));

        let mut stage = NptStage::new("bad", system());
        stage.set_pressure(-1.0);
        assert!(matches!(
            stage.render(),
            Err(StageError::InvalidParameter {
                parameter: "pres0",
                ..
            })
        ));
    }
}
