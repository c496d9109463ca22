use crate::core::io::namelist::NamelistWriter;
use crate::core::models::system::SystemInfo;
use crate::engine::error::StageError;
use crate::engine::stage::{Stage, StageParams, WriteFrequencies, ensure};
use std::io::{self, Write};
use std::sync::Arc;

/// Cycle and output settings of an energy minimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimizationSettings {
    /// Minimization method flag, written as `ntmin`.
    pub min_trust_region_steps: u32,
    /// Total number of cycles, written as `maxcyc`.
    pub max_cycles: u32,
    /// Cycle after which steepest descent switches to conjugate gradient, written as `ncyc`.
    pub conjugate_gradient_start_cycle: u32,
    pub write_frequencies: WriteFrequencies,
}

impl Default for MinimizationSettings {
    fn default() -> Self {
        Self {
            min_trust_region_steps: 2,
            max_cycles: 1000,
            conjugate_gradient_start_cycle: 10,
            write_frequencies: WriteFrequencies::new(500, 50, 500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MinimizationStage {
    params: StageParams,
    min_trust_region_steps: u32,
    max_cycles: u32,
    conjugate_gradient_start_cycle: u32,
}

impl MinimizationStage {
    /// NetCDF trajectory output (`ioutfm`).
    pub const OUTPUT_FORMAT: u8 = 1;
    /// NetCDF restart output (`ntxo`).
    pub const RESTART_FORMAT: u8 = 2;
    /// No SHAKE (`ntc`).
    pub const BOND_CONSTRAINT: u8 = 1;
    /// All bond interactions evaluated (`ntf`).
    pub const FORCE_EVALUATION: u8 = 1;
    /// Constant-volume periodic boundaries (`ntb`).
    pub const PERIODIC_BOUNDARY: u8 = 1;

    pub fn new(name: impl Into<String>, system: Arc<dyn SystemInfo>) -> Self {
        Self::with_settings(name, system, MinimizationSettings::default())
    }

    pub fn with_settings(
        name: impl Into<String>,
        system: Arc<dyn SystemInfo>,
        settings: MinimizationSettings,
    ) -> Self {
        let mut params = StageParams::new(name, system);
        params.write_frequencies = settings.write_frequencies;
        Self {
            params,
            min_trust_region_steps: settings.min_trust_region_steps,
            max_cycles: settings.max_cycles,
            conjugate_gradient_start_cycle: settings.conjugate_gradient_start_cycle,
        }
    }

    pub fn settings(&self) -> MinimizationSettings {
        MinimizationSettings {
            min_trust_region_steps: self.min_trust_region_steps,
            max_cycles: self.max_cycles,
            conjugate_gradient_start_cycle: self.conjugate_gradient_start_cycle,
            write_frequencies: self.params.write_frequencies,
        }
    }

    /// Reuses this stage under a new name with fresh cycle and output settings.
    ///
    /// Restraint, cutoff and the CHARMM water flag carry over.
    pub fn reseed(&mut self, name: impl Into<String>, settings: MinimizationSettings) -> &mut Self {
        self.params.name = name.into();
        self.params.write_frequencies = settings.write_frequencies;
        self.min_trust_region_steps = settings.min_trust_region_steps;
        self.max_cycles = settings.max_cycles;
        self.conjugate_gradient_start_cycle = settings.conjugate_gradient_start_cycle;
        self
    }

    pub fn set_max_cycles(&mut self, cycles: u32) -> &mut Self {
        self.max_cycles = cycles;
        self
    }

    pub fn set_conjugate_gradient_start_cycle(&mut self, cycle: u32) -> &mut Self {
        self.conjugate_gradient_start_cycle = cycle;
        self
    }

    pub fn set_min_trust_region_steps(&mut self, steps: u32) -> &mut Self {
        self.min_trust_region_steps = steps;
        self
    }

    pub fn max_cycles(&self) -> u32 {
        self.max_cycles
    }

    pub fn conjugate_gradient_start_cycle(&self) -> u32 {
        self.conjugate_gradient_start_cycle
    }

    pub fn min_trust_region_steps(&self) -> u32 {
        self.min_trust_region_steps
    }
}

impl Stage for MinimizationStage {
    fn params(&self) -> &StageParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut StageParams {
        &mut self.params
    }

    fn title(&self) -> &'static str {
        "Minimization"
    }

    fn validate(&self) -> Result<(), StageError> {
        self.params.validate()?;
        ensure(
            &self.params,
            "ntmin",
            self.min_trust_region_steps > 0,
            "must be positive",
        )?;
        ensure(
            &self.params,
            "maxcyc",
            self.max_cycles > 0,
            "must be at least one cycle",
        )?;
        ensure(
            &self.params,
            "ncyc",
            self.conjugate_gradient_start_cycle > 0,
            "must be at least one cycle",
        )
    }

    fn write_stage_fields(&self, out: &mut dyn Write) -> io::Result<()> {
        let freq = self.params.write_frequencies;
        NamelistWriter::new(out)
            .int("imin", 1)?
            .int("ntmin", self.min_trust_region_steps)?
            .int("maxcyc", self.max_cycles)?
            .int("ncyc", self.conjugate_gradient_start_cycle)?
            .int("ntpr", freq.energy)?
            .int("ntwx", freq.trajectory)?
            .int("ntwr", freq.restart)?
            .int("ioutfm", Self::OUTPUT_FORMAT)?
            .int("ntxo", Self::RESTART_FORMAT)?
            .int("ntc", Self::BOND_CONSTRAINT)?
            .int("ntf", Self::FORCE_EVALUATION)?
            .int("ntb", Self::PERIODIC_BOUNDARY)?
            .real("cut", self.params.cutoff)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::system::SystemSummary;
    use std::fs;

    const DEFAULT_BODY: &str = "\
imin=1,
ntmin=2,
maxcyc=1000,
ncyc=10,
ntpr=50,
ntwx=500,
ntwr=500,
ioutfm=1,
ntxo=2,
ntc=1,
ntf=1,
ntb=1,
cut=8.0,
";

    fn system(residues: usize) -> Arc<dyn SystemInfo> {
        Arc::new(SystemSummary::protein_only(residues))
    }

    #[test]
    fn default_minimization_renders_full_input_file() {
        let stage = MinimizationStage::new("step5", system(300));
        let expected = format!("Minimization: step5\n&cntrl\n{}ntr=0\n&end\n", DEFAULT_BODY);
        assert_eq!(stage.render().unwrap(), expected);
    }

    #[test]
    fn restrained_minimization_places_restraint_after_body() {
        let mut stage = MinimizationStage::new("step1", system(300));
        stage.set_restraint("@CA,C,N,O", 5.0);

        let text = stage.render().unwrap();
        let expected_tail = format!(
            "{}ntr=1,\nrestraintmask=\":1-300&!@H=|:@CA,C,N,O\",\nrestraint_wt=5.0,\n&end\n",
            DEFAULT_BODY
        );
        assert!(text.starts_with("Minimization: step1\n&cntrl\n"));
        assert!(text.ends_with(&expected_tail));
    }

    #[test]
    fn charmm_water_directive_precedes_minimization_fields() {
        let stage = MinimizationStage::new(
            "wet",
            Arc::new(SystemSummary::protein_only(3).with_charmm_water(true)),
        );
        let text = stage.render().unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[2], "   WATNAM = 'TIP3', OWTNM = 'OH2',");
        assert_eq!(lines[3], "imin=1,");
    }

    #[test]
    fn base_and_specific_setters_chain_on_concrete_type() {
        let mut stage = MinimizationStage::new("chain", system(10));
        stage
            .set_cutoff(10.0)
            .set_max_cycles(5000)
            .set_write_freq_energy(10)
            .set_conjugate_gradient_start_cycle(2500)
            .set_min_trust_region_steps(1);

        let text = stage.render().unwrap();
        assert!(text.contains("cut=10.0,\n"));
        assert!(text.contains("maxcyc=5000,\n"));
        assert!(text.contains("ncyc=2500,\n"));
        assert!(text.contains("ntmin=1,\n"));
        assert!(text.contains("ntpr=10,\n"));
    }

    #[test]
    fn with_settings_applies_write_frequencies() {
        let settings = MinimizationSettings {
            write_frequencies: WriteFrequencies::new(100, 20, 300),
            ..MinimizationSettings::default()
        };
        let stage = MinimizationStage::with_settings("custom", system(1), settings);

        assert_eq!(stage.settings(), settings);
        let text = stage.render().unwrap();
        assert!(text.contains("ntpr=20,\nntwx=100,\nntwr=300,\n"));
    }

    #[test]
    fn reseed_renames_and_keeps_restraint() {
        let dir = tempfile::tempdir().unwrap();
        let mut stage = MinimizationStage::new("step1", system(50));
        stage.set_restraint("@CA", 2.0).set_cutoff(9.0).set_max_cycles(10);

        stage.reseed("step3", MinimizationSettings::default());
        let target = dir.path().join(stage.input_file_name());
        stage.run(&target).unwrap();

        assert_eq!(stage.name(), "step3");
        assert!(target.ends_with("step3.in"));
        let text = fs::read_to_string(&target).unwrap();
        assert!(text.starts_with("Minimization: step3\n"));
        assert!(text.contains("maxcyc=1000,\n"));
        assert!(text.contains("cut=9.0,\n"));
        assert!(text.contains("restraintmask=\":1-50&!@H=|:@CA\",\n"));
    }

    #[test]
    fn zero_cycle_counts_are_rejected() {
        let mut stage = MinimizationStage::new("bad", system(1));
        stage.set_max_cycles(0);
        assert!(matches!(
            stage.render(),
            Err(StageError::InvalidParameter {
                parameter: "maxcyc",
                ..
            })
        ));

        stage.set_max_cycles(10).set_conjugate_gradient_start_cycle(0);
        assert!(matches!(
            stage.validate(),
            Err(StageError::InvalidParameter { parameter: "ncyc", .. })
        ));
    }

    #[test]
    fn run_is_idempotent_for_unchanged_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("idem.in");
        let mut stage = MinimizationStage::new("idem", system(12));
        stage.set_restraint(":1-12@CA", 0.1);

        stage.run(&target).unwrap();
        let first = fs::read_to_string(&target).unwrap();
        stage.run(&target).unwrap();
        let second = fs::read_to_string(&target).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.matches("restraintmask=").count(), 1);
    }
}
