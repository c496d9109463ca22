use ambermd::core::models::system::{SystemInfo as RsSystemInfo, SystemSummary};
use ambermd::engine::error::StageError;
use ambermd::engine::stage::{Stage, WriteFrequencies};
use ambermd::engine::stages::dynamics::{
    BarostatSettings, DynamicsSettings, DynamicsStage, NptStage, NvtStage,
};
use ambermd::engine::stages::minimization::{MinimizationSettings, MinimizationStage};
use pyo3::create_exception;
use pyo3::exceptions::PyException;
use pyo3::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

create_exception!(
    pyamber,
    ConfigError,
    PyException,
    "Exception raised when a stage is configured with invalid parameters."
);
create_exception!(
    pyamber,
    WriteError,
    PyException,
    "Exception raised when an input file cannot be written."
);

/// Python exception family a [`StageError`] is raised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorClass {
    Config,
    Write,
}

fn classify(error: &StageError) -> ErrorClass {
    match error {
        StageError::InvalidParameter { .. } | StageError::DuplicateStageName { .. } => {
            ErrorClass::Config
        }
        StageError::Io { .. } | StageError::Format { .. } => ErrorClass::Write,
    }
}

fn to_py_err(error: StageError) -> PyErr {
    let message = error.to_string();
    match classify(&error) {
        ErrorClass::Config => ConfigError::new_err(message),
        ErrorClass::Write => WriteError::new_err(message),
    }
}

/// `<name>.in` in the working directory.
fn default_target(stage: &impl Stage) -> PathBuf {
    Path::new(".").join(stage.input_file_name())
}

fn write_stage(stage: &impl Stage, path: Option<PathBuf>) -> Result<PathBuf, StageError> {
    let target = path.unwrap_or_else(|| default_target(stage));
    stage.run(&target)?;
    Ok(target)
}

fn run_stage(stage: &impl Stage, path: Option<PathBuf>) -> PyResult<PathBuf> {
    write_stage(stage, path).map_err(to_py_err)
}

fn minimization_settings(
    ntmin: u32,
    maxcyc: u32,
    ncyc: u32,
    ntwx: u32,
    ntpr: u32,
    ntwr: u32,
) -> MinimizationSettings {
    MinimizationSettings {
        min_trust_region_steps: ntmin,
        max_cycles: maxcyc,
        conjugate_gradient_start_cycle: ncyc,
        write_frequencies: WriteFrequencies::new(ntwx, ntpr, ntwr),
    }
}

/// Renames `stage` with fresh cycle settings and writes it to `path` or its default target.
fn reseed_and_write(
    stage: &mut MinimizationStage,
    name: String,
    settings: MinimizationSettings,
    path: Option<PathBuf>,
) -> Result<PathBuf, StageError> {
    stage.reseed(name, settings);
    write_stage(stage, path)
}

/// Residue counts and water model of the simulated system.
#[pyclass(name = "SystemInfo", frozen)]
#[derive(Clone)]
pub struct SystemInfo(SystemSummary);

impl SystemInfo {
    fn shared(&self) -> Arc<dyn RsSystemInfo> {
        Arc::new(self.0)
    }
}

#[pymethods]
impl SystemInfo {
    #[new]
    #[pyo3(signature = (protein = 0, dna = 0, rna = 0, lipid = 0, carbohydrate = 0, charmm_water = false))]
    fn new(
        protein: usize,
        dna: usize,
        rna: usize,
        lipid: usize,
        carbohydrate: usize,
        charmm_water: bool,
    ) -> Self {
        Self(SystemSummary {
            protein,
            dna,
            rna,
            lipid,
            carbohydrate,
            charmm_water,
        })
    }

    /// Load a system summary from a TOML file.
    #[staticmethod]
    fn from_file(path: PathBuf) -> PyResult<Self> {
        SystemSummary::load(&path)
            .map(Self)
            .map_err(|e| ConfigError::new_err(e.to_string()))
    }

    #[pyo3(name = "getNprotein")]
    fn protein_residues(&self) -> usize {
        self.0.protein_residues()
    }

    #[pyo3(name = "getnDna")]
    fn dna_residues(&self) -> usize {
        self.0.dna_residues()
    }

    #[pyo3(name = "getnRna")]
    fn rna_residues(&self) -> usize {
        self.0.rna_residues()
    }

    #[pyo3(name = "getnLipid")]
    fn lipid_residues(&self) -> usize {
        self.0.lipid_residues()
    }

    #[pyo3(name = "getnCarbo")]
    fn carbohydrate_residues(&self) -> usize {
        self.0.carbohydrate_residues()
    }

    #[pyo3(name = "getHasCharmmWater")]
    fn has_charmm_water(&self) -> bool {
        self.0.has_charmm_water()
    }

    fn __repr__(&self) -> String {
        format!(
            "SystemInfo(protein={}, dna={}, rna={}, lipid={}, carbohydrate={}, charmm_water={})",
            self.0.protein,
            self.0.dna,
            self.0.rna,
            self.0.lipid,
            self.0.carbohydrate,
            if self.0.charmm_water { "True" } else { "False" }
        )
    }
}

/// Energy minimization stage.
#[pyclass(name = "Min")]
pub struct Min(MinimizationStage);

#[pymethods]
impl Min {
    #[new]
    #[allow(non_snake_case, clippy::too_many_arguments)]
    #[pyo3(signature = (
        name, systemInfo, restraintmask = String::new(), restraint_wt = 0.0, cut = 8.0,
        nTmin = 2, maxCyc = 1000, nCyc = 10, nTwx = 500, nTpr = 50, nTwr = 500
    ))]
    fn new(
        name: String,
        systemInfo: PyRef<'_, SystemInfo>,
        restraintmask: String,
        restraint_wt: f64,
        cut: f64,
        nTmin: u32,
        maxCyc: u32,
        nCyc: u32,
        nTwx: u32,
        nTpr: u32,
        nTwr: u32,
    ) -> Self {
        let settings = minimization_settings(nTmin, maxCyc, nCyc, nTwx, nTpr, nTwr);
        let mut stage = MinimizationStage::with_settings(name, systemInfo.shared(), settings);
        stage.set_restraint(restraintmask, restraint_wt).set_cutoff(cut);
        Self(stage)
    }

    /// Rename the stage with fresh cycle settings and write it again.
    #[allow(non_snake_case, clippy::too_many_arguments)]
    #[pyo3(signature = (name, nTmin = 2, maxCyc = 1000, nCyc = 10, nTwx = 500, nTpr = 50, nTwr = 500))]
    fn __call__(
        &mut self,
        name: String,
        nTmin: u32,
        maxCyc: u32,
        nCyc: u32,
        nTwx: u32,
        nTpr: u32,
        nTwr: u32,
    ) -> PyResult<PathBuf> {
        let settings = minimization_settings(nTmin, maxCyc, nCyc, nTwx, nTpr, nTwr);
        reseed_and_write(&mut self.0, name, settings, None).map_err(to_py_err)
    }

    /// Write the input file and return its path.
    #[pyo3(name = "Run", signature = (path = None))]
    fn run(&self, path: Option<PathBuf>) -> PyResult<PathBuf> {
        run_stage(&self.0, path)
    }

    /// Return the input file contents without writing them.
    fn render(&self) -> PyResult<String> {
        self.0.render().map_err(to_py_err)
    }

    #[getter]
    fn name(&self) -> String {
        self.0.name().to_string()
    }

    #[pyo3(name = "setCut")]
    fn set_cut(mut slf: PyRefMut<'_, Self>, cut: f64) -> PyRefMut<'_, Self> {
        slf.0.set_cutoff(cut);
        slf
    }

    #[pyo3(name = "setNTpr")]
    fn set_ntpr(mut slf: PyRefMut<'_, Self>, ntpr: u32) -> PyRefMut<'_, Self> {
        slf.0.set_write_freq_energy(ntpr);
        slf
    }

    #[pyo3(name = "setNTwr")]
    fn set_ntwr(mut slf: PyRefMut<'_, Self>, ntwr: u32) -> PyRefMut<'_, Self> {
        slf.0.set_write_freq_restart(ntwr);
        slf
    }

    #[pyo3(name = "setNTwx")]
    fn set_ntwx(mut slf: PyRefMut<'_, Self>, ntwx: u32) -> PyRefMut<'_, Self> {
        slf.0.set_write_freq_trajectory(ntwx);
        slf
    }

    #[pyo3(name = "setMaxCyc")]
    fn set_max_cyc(mut slf: PyRefMut<'_, Self>, maxcyc: u32) -> PyRefMut<'_, Self> {
        slf.0.set_max_cycles(maxcyc);
        slf
    }

    #[pyo3(name = "setNCyc")]
    fn set_ncyc(mut slf: PyRefMut<'_, Self>, ncyc: u32) -> PyRefMut<'_, Self> {
        slf.0.set_conjugate_gradient_start_cycle(ncyc);
        slf
    }

    #[pyo3(name = "setNTmin")]
    fn set_ntmin(mut slf: PyRefMut<'_, Self>, ntmin: u32) -> PyRefMut<'_, Self> {
        slf.0.set_min_trust_region_steps(ntmin);
        slf
    }
}

fn dynamics_settings(
    temp: f64,
    nstlim: u64,
    dt: f64,
    tautp: f64,
    irest: bool,
    nscm: u32,
) -> DynamicsSettings {
    DynamicsSettings {
        steps: nstlim,
        time_step: dt,
        temperature: temp,
        thermostat_coupling: tautp,
        restart: irest,
        com_removal_interval: nscm,
    }
}

/// Constant-volume heating / equilibration stage.
#[pyclass(name = "NVT")]
pub struct Nvt(NvtStage);

#[pymethods]
impl Nvt {
    #[new]
    #[allow(non_snake_case, clippy::too_many_arguments)]
    #[pyo3(signature = (
        name, systemInfo, restraintmask = String::new(), restraint_wt = 0.0, cut = 8.0,
        temp = 303.15, nstlim = 5000, dt = 0.001, tautp = 1.0, irest = false, nscm = 1000,
        ntwx = 500, ntpr = 500, ntwr = 5000
    ))]
    fn new(
        name: String,
        systemInfo: PyRef<'_, SystemInfo>,
        restraintmask: String,
        restraint_wt: f64,
        cut: f64,
        temp: f64,
        nstlim: u64,
        dt: f64,
        tautp: f64,
        irest: bool,
        nscm: u32,
        ntwx: u32,
        ntpr: u32,
        ntwr: u32,
    ) -> Self {
        let dynamics = dynamics_settings(temp, nstlim, dt, tautp, irest, nscm);
        let mut stage = NvtStage::with_settings(name, systemInfo.shared(), dynamics);
        stage
            .set_restraint(restraintmask, restraint_wt)
            .set_cutoff(cut)
            .set_write_freq_trajectory(ntwx)
            .set_write_freq_energy(ntpr)
            .set_write_freq_restart(ntwr);
        Self(stage)
    }

    #[pyo3(name = "Run", signature = (path = None))]
    fn run(&self, path: Option<PathBuf>) -> PyResult<PathBuf> {
        run_stage(&self.0, path)
    }

    fn render(&self) -> PyResult<String> {
        self.0.render().map_err(to_py_err)
    }

    #[getter]
    fn name(&self) -> String {
        self.0.name().to_string()
    }

    #[pyo3(name = "setCut")]
    fn set_cut(mut slf: PyRefMut<'_, Self>, cut: f64) -> PyRefMut<'_, Self> {
        slf.0.set_cutoff(cut);
        slf
    }

    #[pyo3(name = "setNstlim")]
    fn set_nstlim(mut slf: PyRefMut<'_, Self>, nstlim: u64) -> PyRefMut<'_, Self> {
        slf.0.set_steps(nstlim);
        slf
    }

    #[pyo3(name = "setTemp")]
    fn set_temp(mut slf: PyRefMut<'_, Self>, temp: f64) -> PyRefMut<'_, Self> {
        slf.0.set_temperature(temp);
        slf
    }
}

/// Constant-pressure equilibration / production stage.
#[pyclass(name = "NPT")]
pub struct Npt(NptStage);

#[pymethods]
impl Npt {
    #[new]
    #[allow(non_snake_case, clippy::too_many_arguments)]
    #[pyo3(signature = (
        name, systemInfo, restraintmask = String::new(), restraint_wt = 0.0, cut = 8.0,
        temp = 303.15, nstlim = 5000, dt = 0.001, tautp = 1.0, irest = false, nscm = 1000,
        ntwx = 500, ntpr = 500, ntwr = 5000, pres0 = 1.0, taup = 2.0
    ))]
    fn new(
        name: String,
        systemInfo: PyRef<'_, SystemInfo>,
        restraintmask: String,
        restraint_wt: f64,
        cut: f64,
        temp: f64,
        nstlim: u64,
        dt: f64,
        tautp: f64,
        irest: bool,
        nscm: u32,
        ntwx: u32,
        ntpr: u32,
        ntwr: u32,
        pres0: f64,
        taup: f64,
    ) -> Self {
        let dynamics = dynamics_settings(temp, nstlim, dt, tautp, irest, nscm);
        let barostat = BarostatSettings {
            pressure: pres0,
            relaxation_time: taup,
        };
        let mut stage = NptStage::with_settings(name, systemInfo.shared(), dynamics, barostat);
        stage
            .set_restraint(restraintmask, restraint_wt)
            .set_cutoff(cut)
            .set_write_freq_trajectory(ntwx)
            .set_write_freq_energy(ntpr)
            .set_write_freq_restart(ntwr);
        Self(stage)
    }

    #[pyo3(name = "Run", signature = (path = None))]
    fn run(&self, path: Option<PathBuf>) -> PyResult<PathBuf> {
        run_stage(&self.0, path)
    }

    fn render(&self) -> PyResult<String> {
        self.0.render().map_err(to_py_err)
    }

    #[getter]
    fn name(&self) -> String {
        self.0.name().to_string()
    }

    #[pyo3(name = "setCut")]
    fn set_cut(mut slf: PyRefMut<'_, Self>, cut: f64) -> PyRefMut<'_, Self> {
        slf.0.set_cutoff(cut);
        slf
    }

    #[pyo3(name = "setNstlim")]
    fn set_nstlim(mut slf: PyRefMut<'_, Self>, nstlim: u64) -> PyRefMut<'_, Self> {
        slf.0.set_steps(nstlim);
        slf
    }

    #[pyo3(name = "setTemp")]
    fn set_temp(mut slf: PyRefMut<'_, Self>, temp: f64) -> PyRefMut<'_, Self> {
        slf.0.set_temperature(temp);
        slf
    }

    #[pyo3(name = "setPres0")]
    fn set_pres0(mut slf: PyRefMut<'_, Self>, pres0: f64) -> PyRefMut<'_, Self> {
        slf.0.set_pressure(pres0);
        slf
    }
}

/// Generate AMBER &cntrl input files from Python.
#[pymodule]
fn pyamber(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<SystemInfo>()?;
    m.add_class::<Min>()?;
    m.add_class::<Nvt>()?;
    m.add_class::<Npt>()?;
    m.add("ConfigError", m.py().get_type::<ConfigError>())?;
    m.add("WriteError", m.py().get_type::<WriteError>())?;
    Ok(())
}
