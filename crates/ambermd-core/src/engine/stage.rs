use super::error::StageError;
use crate::core::io::namelist::{CNTRL_OPEN, NAMELIST_END, NamelistWriter};
use crate::core::mask::compose_restraint_mask;
use crate::core::models::system::SystemInfo;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Atom-name directive required when the solvent follows the CHARMM TIP3P naming.
pub const CHARMM_WATER_DIRECTIVE: &str = "   WATNAM = 'TIP3', OWTNM = 'OH2',";
pub const INPUT_FILE_EXTENSION: &str = "in";

/// Output cadence, in steps, for trajectory (`ntwx`), energy (`ntpr`) and restart (`ntwr`)
/// records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteFrequencies {
    pub trajectory: u32,
    pub energy: u32,
    pub restart: u32,
}

impl WriteFrequencies {
    pub const fn new(trajectory: u32, energy: u32, restart: u32) -> Self {
        Self {
            trajectory,
            energy,
            restart,
        }
    }
}

impl Default for WriteFrequencies {
    fn default() -> Self {
        Self::new(500, 50, 500)
    }
}

/// Configuration shared by every stage type.
#[derive(Debug, Clone)]
pub struct StageParams {
    /// Stage identifier; also the stem of the conventional input file name.
    pub name: String,
    pub system: Arc<dyn SystemInfo>,
    /// Non-bonded cutoff in angstroms.
    pub cutoff: f64,
    /// Raw user mask. Empty means the stage is unrestrained.
    pub restraint_mask: String,
    /// Restraint force constant in kcal/mol/A^2.
    pub restraint_weight: f64,
    pub write_frequencies: WriteFrequencies,
    /// Forces the CHARMM water directive even if the system does not report it.
    pub charmm_water: bool,
}

impl StageParams {
    pub const DEFAULT_CUTOFF: f64 = 8.0;

    pub fn new(name: impl Into<String>, system: Arc<dyn SystemInfo>) -> Self {
        Self {
            name: name.into(),
            system,
            cutoff: Self::DEFAULT_CUTOFF,
            restraint_mask: String::new(),
            restraint_weight: 0.0,
            write_frequencies: WriteFrequencies::default(),
            charmm_water: false,
        }
    }

    pub fn uses_charmm_water(&self) -> bool {
        self.charmm_water || self.system.has_charmm_water()
    }

    pub fn is_restrained(&self) -> bool {
        !self.restraint_mask.is_empty()
    }

    pub fn validate(&self) -> Result<(), StageError> {
        ensure(
            self,
            "cut",
            self.cutoff.is_finite() && self.cutoff >= 0.0,
            "must be a non-negative number of angstroms",
        )?;
        ensure(
            self,
            "restraint_wt",
            self.restraint_weight.is_finite() && self.restraint_weight >= 0.0,
            "must be a non-negative force constant",
        )?;
        ensure(
            self,
            "ntwx",
            self.write_frequencies.trajectory > 0,
            "must be at least one step",
        )?;
        ensure(
            self,
            "ntpr",
            self.write_frequencies.energy > 0,
            "must be at least one step",
        )?;
        ensure(
            self,
            "ntwr",
            self.write_frequencies.restart > 0,
            "must be at least one step",
        )
    }
}

/// Returns [`StageError::InvalidParameter`] for `parameter` unless `ok` holds.
pub(crate) fn ensure(
    params: &StageParams,
    parameter: &'static str,
    ok: bool,
    reason: &str,
) -> Result<(), StageError> {
    if ok {
        Ok(())
    } else {
        Err(StageError::InvalidParameter {
            stage: params.name.clone(),
            parameter,
            reason: reason.to_string(),
        })
    }
}

/// The fixed sequence in which an input file is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    Header,
    WaterDirective,
    StageFields,
    RestraintDirective,
    Footer,
}

impl WriteStep {
    pub const SEQUENCE: [WriteStep; 5] = [
        WriteStep::Header,
        WriteStep::WaterDirective,
        WriteStep::StageFields,
        WriteStep::RestraintDirective,
        WriteStep::Footer,
    ];
}

/// A simulation stage that can materialize itself as an AMBER `&cntrl` input file.
///
/// Implementors provide access to their [`StageParams`], a title and usually
/// [`write_stage_fields`](Stage::write_stage_fields). Every other hook has a default that
/// produces the common layout:
///
/// ```text
/// <Title>: <name>
/// &cntrl
/// [CHARMM water directive]
/// [stage fields]
/// ntr=0                    | ntr=1, restraintmask=..., restraint_wt=... (three lines)
/// &end
/// ```
///
/// The fluent setters return `&mut Self`, so chaining on a concrete stage keeps its
/// concrete type and its own setters stay reachable.
pub trait Stage {
    fn params(&self) -> &StageParams;
    fn params_mut(&mut self) -> &mut StageParams;
    fn title(&self) -> &'static str;

    fn name(&self) -> &str {
        &self.params().name
    }

    /// Conventional input file name, `<name>.in`.
    fn input_file_name(&self) -> String {
        format!("{}.{}", self.name(), INPUT_FILE_EXTENSION)
    }

    fn validate(&self) -> Result<(), StageError> {
        self.params().validate()
    }

    /// Restraint selection derived from the raw mask, recomputed on every call.
    fn effective_restraint_mask(&self) -> String {
        let params = self.params();
        compose_restraint_mask(&params.restraint_mask, params.system.solute_residues())
    }

    fn write_header(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}: {}", self.title(), self.name())?;
        writeln!(out, "{}", CNTRL_OPEN)
    }

    fn write_water_directive(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.params().uses_charmm_water() {
            writeln!(out, "{}", CHARMM_WATER_DIRECTIVE)?;
        }
        Ok(())
    }

    fn write_stage_fields(&self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    fn write_restraint_directive(&self, out: &mut dyn Write) -> io::Result<()> {
        let params = self.params();
        if !params.is_restrained() {
            return writeln!(out, "ntr=0");
        }
        NamelistWriter::new(out)
            .int("ntr", 1)?
            .raw("restraintmask", self.effective_restraint_mask())?
            .real("restraint_wt", params.restraint_weight)?;
        Ok(())
    }

    fn write_footer(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", NAMELIST_END)
    }

    fn write_step(&self, step: WriteStep, out: &mut dyn Write) -> io::Result<()> {
        match step {
            WriteStep::Header => self.write_header(out),
            WriteStep::WaterDirective => self.write_water_directive(out),
            WriteStep::StageFields => self.write_stage_fields(out),
            WriteStep::RestraintDirective => self.write_restraint_directive(out),
            WriteStep::Footer => self.write_footer(out),
        }
    }

    /// Renders the whole input file into memory.
    fn render(&self) -> Result<String, StageError> {
        self.validate()?;
        let mut buf = Vec::new();
        for step in WriteStep::SEQUENCE {
            self.write_step(step, &mut buf)
                .map_err(|source| StageError::Format {
                    stage: self.name().to_string(),
                    source,
                })?;
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Writes the input file to `target`.
    ///
    /// The header step truncates the target, every later step reopens it for appending and
    /// closes it again. A failing step leaves the earlier steps on disk.
    fn run(&self, target: &Path) -> Result<(), StageError> {
        self.validate()?;
        info!(
            "Writing {} stage '{}' to {:?}",
            self.title(),
            self.name(),
            target
        );

        let io_error = |source| StageError::Io {
            path: target.to_path_buf(),
            source,
        };
        for step in WriteStep::SEQUENCE {
            debug!("Stage '{}': writing {:?}", self.name(), step);
            let file = match step {
                WriteStep::Header => File::create(target),
                _ => OpenOptions::new().append(true).open(target),
            }
            .map_err(io_error)?;
            let mut writer = BufWriter::new(file);
            self.write_step(step, &mut writer)
                .and_then(|_| writer.flush())
                .map_err(io_error)?;
        }
        Ok(())
    }

    fn set_cutoff(&mut self, cutoff: f64) -> &mut Self
    where
        Self: Sized,
    {
        self.params_mut().cutoff = cutoff;
        self
    }

    fn set_write_freq_trajectory(&mut self, steps: u32) -> &mut Self
    where
        Self: Sized,
    {
        self.params_mut().write_frequencies.trajectory = steps;
        self
    }

    fn set_write_freq_energy(&mut self, steps: u32) -> &mut Self
    where
        Self: Sized,
    {
        self.params_mut().write_frequencies.energy = steps;
        self
    }

    fn set_write_freq_restart(&mut self, steps: u32) -> &mut Self
    where
        Self: Sized,
    {
        self.params_mut().write_frequencies.restart = steps;
        self
    }

    fn set_restraint(&mut self, mask: impl Into<String>, weight: f64) -> &mut Self
    where
        Self: Sized,
    {
        let params = self.params_mut();
        params.restraint_mask = mask.into();
        params.restraint_weight = weight;
        self
    }

    fn set_charmm_water(&mut self, charmm_water: bool) -> &mut Self
    where
        Self: Sized,
    {
        self.params_mut().charmm_water = charmm_water;
        self
    }
}
