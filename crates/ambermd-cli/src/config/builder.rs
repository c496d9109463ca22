use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileStageConfig, FileStageKind, FileSystemConfig};
use super::models::AppConfig;
use crate::cli::{EquilArgs, SystemArgs, WriteArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use ambermd::core::models::system::{SystemInfo, SystemSummary};
use ambermd::engine::stage::Stage;
use ambermd::engine::stages::AnyStage;
use ambermd::engine::stages::dynamics::{DynamicsStage, NptStage, NvtStage};
use ambermd::engine::stages::minimization::MinimizationStage;
use ambermd::workflows::equilibration::{self, EquilibrationConfig};
use ambermd::workflows::protocol::Protocol;
use std::sync::Arc;
use tracing::{debug, warn};

macro_rules! apply_if_some {
    ($target:expr, $( $value:expr => $method:ident ),+ $(,)?) => {
        $(
            if let Some(x) = $value { $target.$method(x); }
        )+
    };
}

pub fn build_write_config(args: &WriteArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = FileConfig::from_file(&args.config)?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let summary: SystemSummary = file_config.system.take().unwrap_or_default().into();
    debug!("System summary: {:?}", summary);
    let system: Arc<dyn SystemInfo> = Arc::new(summary);

    if file_config.stages.is_empty() {
        return Err(CliError::Config(
            "The protocol file defines no [[stage]] tables.".to_string(),
        ));
    }

    let protocol = file_config
        .stages
        .into_iter()
        .map(|stage| build_stage(stage, system.clone()))
        .collect::<Result<Protocol>>()?;

    Ok(AppConfig {
        output_dir: args.output_dir.clone().unwrap_or(defaults.output_dir),
        protocol,
    })
}

pub fn build_equilibration_config(args: &EquilArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let summary = resolve_system(&args.system)?;
    if summary.solute_residues() == 0 {
        return Err(CliError::Argument(
            "The system has no solute residues. Pass --system or at least one residue count."
                .to_string(),
        ));
    }

    let mut config = EquilibrationConfig::new(&args.heavy_mask, &args.backbone_mask);
    config.temperature = args.temp.unwrap_or(defaults.temperature);
    config.production_ns = args.ns.unwrap_or(defaults.production_ns);
    config.extra_mask = args.add_mask.clone();

    Ok(AppConfig {
        output_dir: args.output_dir.clone().unwrap_or(defaults.output_dir),
        protocol: equilibration::build(Arc::new(summary), &config)?,
    })
}

fn resolve_system(args: &SystemArgs) -> Result<SystemSummary> {
    let summary = match &args.system {
        Some(path) => {
            debug!("Loading system summary from {:?}", path);
            SystemSummary::load(path)?
        }
        None => SystemSummary {
            protein: args.protein.unwrap_or(0),
            dna: args.dna.unwrap_or(0),
            rna: args.rna.unwrap_or(0),
            lipid: args.lipid.unwrap_or(0),
            carbohydrate: args.carbohydrate.unwrap_or(0),
            charmm_water: false,
        },
    };
    Ok(if args.charmm_water {
        summary.with_charmm_water(true)
    } else {
        summary
    })
}

fn build_stage(stage: FileStageConfig, system: Arc<dyn SystemInfo>) -> Result<AnyStage> {
    check_stage_keys(&stage)?;

    let mut any: AnyStage = match stage.kind {
        FileStageKind::Minimization => {
            let mut min = MinimizationStage::new(&stage.name, system);
            apply_if_some!(min,
                stage.min_trust_region_steps => set_min_trust_region_steps,
                stage.max_cycles => set_max_cycles,
                stage.conjugate_gradient_start_cycle => set_conjugate_gradient_start_cycle,
            );
            min.into()
        }
        FileStageKind::Nvt => {
            let mut nvt = NvtStage::new(&stage.name, system);
            apply_dynamics(&mut nvt, &stage);
            nvt.into()
        }
        FileStageKind::Npt => {
            let mut npt = NptStage::new(&stage.name, system);
            apply_dynamics(&mut npt, &stage);
            apply_if_some!(npt,
                stage.pressure => set_pressure,
                stage.pressure_relaxation_time => set_pressure_relaxation_time,
            );
            npt.into()
        }
    };

    apply_if_some!(any,
        stage.cutoff => set_cutoff,
        stage.charmm_water => set_charmm_water,
        stage.write_freq_trajectory => set_write_freq_trajectory,
        stage.write_freq_energy => set_write_freq_energy,
        stage.write_freq_restart => set_write_freq_restart,
    );

    match (stage.restraint_mask, stage.restraint_weight) {
        (Some(mask), weight) => {
            if weight.is_none() {
                warn!(
                    "Stage '{}' has a restraint mask but no restraint-weight; using 0.0.",
                    stage.name
                );
            }
            any.set_restraint(mask, weight.unwrap_or(0.0));
        }
        (None, Some(_)) => {
            return Err(CliError::Config(format!(
                "Stage '{}' sets restraint-weight without restraint-mask.",
                stage.name
            )));
        }
        (None, None) => {}
    }

    Ok(any)
}

fn apply_dynamics<S: DynamicsStage>(target: &mut S, stage: &FileStageConfig) {
    apply_if_some!(target,
        stage.steps => set_steps,
        stage.time_step => set_time_step,
        stage.temperature => set_temperature,
        stage.thermostat_coupling => set_thermostat_coupling,
        stage.restart => set_restart,
        stage.com_removal_interval => set_com_removal_interval,
    );
}

fn check_stage_keys(stage: &FileStageConfig) -> Result<()> {
    let minimization_keys = [
        ("min-trust-region-steps", stage.min_trust_region_steps.is_some()),
        ("max-cycles", stage.max_cycles.is_some()),
        (
            "conjugate-gradient-start-cycle",
            stage.conjugate_gradient_start_cycle.is_some(),
        ),
    ];
    let dynamics_keys = [
        ("steps", stage.steps.is_some()),
        ("time-step", stage.time_step.is_some()),
        ("temperature", stage.temperature.is_some()),
        ("thermostat-coupling", stage.thermostat_coupling.is_some()),
        ("restart", stage.restart.is_some()),
        ("com-removal-interval", stage.com_removal_interval.is_some()),
    ];
    let barostat_keys = [
        ("pressure", stage.pressure.is_some()),
        (
            "pressure-relaxation-time",
            stage.pressure_relaxation_time.is_some(),
        ),
    ];

    let forbidden: Vec<&(&str, bool)> = match stage.kind {
        FileStageKind::Minimization => dynamics_keys.iter().chain(&barostat_keys).collect(),
        FileStageKind::Nvt => minimization_keys.iter().chain(&barostat_keys).collect(),
        FileStageKind::Npt => minimization_keys.iter().collect(),
    };

    match forbidden.into_iter().find(|(_, present)| *present) {
        Some((key, _)) => Err(CliError::Config(format!(
            "Key '{}' is not valid for {:?} stage '{}'.",
            key, stage.kind, stage.name
        ))),
        None => Ok(()),
    }
}

fn apply_set_values(mut file_config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) =
            parser::parse_key_value(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;
        let system = file_config
            .system
            .get_or_insert_with(FileSystemConfig::default);

        let count = || {
            parser::parse_value::<usize>(key, value, "integer")
                .map_err(|e| CliError::Config(e.to_string()))
        };
        match key {
            "system.protein" => system.protein = Some(count()?),
            "system.dna" => system.dna = Some(count()?),
            "system.rna" => system.rna = Some(count()?),
            "system.lipid" => system.lipid = Some(count()?),
            "system.carbohydrate" => system.carbohydrate = Some(count()?),
            "system.charmm-water" => {
                system.charmm_water = Some(
                    parser::parse_value(key, value, "boolean")
                        .map_err(|e| CliError::Config(e.to_string()))?,
                )
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(file_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use ambermd::engine::error::StageError;
    use clap::Parser;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const PROTOCOL: &str = r#"
        [system]
        protein = 120
        dna = 10

        [[stage]]
        type = "minimization"
        name = "step1"
        restraint-mask = "@CA,C,N,O"
        restraint-weight = 5.0
        max-cycles = 2000
        cutoff = 10.0

        [[stage]]
        type = "nvt"
        name = "step2"
        steps = 15000
        thermostat-coupling = 0.5

        [[stage]]
        type = "npt"
        name = "step3"
        restart = true
        pressure = 1.5
        write-freq-trajectory = 1000
    "#;

    fn write_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("protocol.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn write_args(config_path: &Path, extra: &[&str]) -> WriteArgs {
        let mut args = vec![
            "ambermd".to_string(),
            "write".to_string(),
            "-c".to_string(),
            config_path.to_str().unwrap().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        match Cli::parse_from(args).command {
            Commands::Write(args) => args,
            _ => panic!("Expected 'write' subcommand"),
        }
    }

    fn equil_args(extra: &[&str]) -> EquilArgs {
        let mut args = vec![
            "ambermd",
            "equil",
            "--heavy-mask",
            "@CA,C,N,O",
            "--backbone-mask",
            "@CA",
        ];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Equil(args) => args,
            _ => panic!("Expected 'equil' subcommand"),
        }
    }

    #[test]
    fn builds_protocol_from_file_with_stage_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config_file(&dir, PROTOCOL);

        let config = build_write_config(&write_args(&config_path, &[])).unwrap();

        assert_eq!(config.output_dir, PathBuf::from("."));
        let stages = config.protocol.stages();
        assert_eq!(stages.len(), 3);

        let step1 = stages[0].render().unwrap();
        assert!(step1.contains("maxcyc=2000,\n"));
        assert!(step1.contains("cut=10.0,\n"));
        assert!(step1.contains("restraintmask=\":1-130&!@H=|:@CA,C,N,O\",\n"));

        let step2 = stages[1].render().unwrap();
        assert!(step2.contains("nstlim=15000,\n"));
        assert!(step2.contains("tautp=0.5,\n"));

        let step3 = stages[2].render().unwrap();
        assert!(step3.contains("irest=1,\n"));
        assert!(step3.contains("pres0=1.5,\n"));
        assert!(step3.contains("ntwx=1000,\n"));
    }

    #[test]
    fn set_values_override_system_counts() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config_file(&dir, PROTOCOL);
        let args = write_args(
            &config_path,
            &[
                "-S",
                "system.protein=300",
                "-S",
                "system.charmm-water=true",
                "-o",
                "out",
            ],
        );

        let config = build_write_config(&args).unwrap();

        assert_eq!(config.output_dir, PathBuf::from("out"));
        let step1 = &config.protocol.stages()[0];
        assert_eq!(step1.params().system.solute_residues(), 310);
        assert!(step1.render().unwrap().contains("WATNAM = 'TIP3'"));
    }

    #[test]
    fn unsupported_set_key_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config_file(&dir, PROTOCOL);
        let args = write_args(&config_path, &["-S", "stage.cutoff=9"]);

        let result = build_write_config(&args);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("stage.cutoff")));
    }

    #[test]
    fn invalid_set_value_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config_file(&dir, PROTOCOL);
        let args = write_args(&config_path, &["-S", "system.dna=lots"]);

        assert!(matches!(
            build_write_config(&args),
            Err(CliError::Config(msg)) if msg.contains("integer")
        ));
    }

    #[test]
    fn keys_of_other_stage_kinds_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config_file(
            &dir,
            r#"
            [[stage]]
            type = "nvt"
            name = "heat"
            max-cycles = 10
            "#,
        );

        let result = build_write_config(&write_args(&config_path, &[]));
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("max-cycles")));
    }

    #[test]
    fn restraint_weight_without_mask_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config_file(
            &dir,
            r#"
            [[stage]]
            type = "minimization"
            name = "min"
            restraint-weight = 2.0
            "#,
        );

        let result = build_write_config(&write_args(&config_path, &[]));
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("restraint-mask")));
    }

    #[test]
    fn empty_protocol_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config_file(&dir, "[system]\nprotein = 1\n");

        let result = build_write_config(&write_args(&config_path, &[]));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn equilibration_uses_counts_and_defaults() {
        let config = build_equilibration_config(&equil_args(&["--protein", "150"])).unwrap();

        assert_eq!(config.protocol.len(), 10);
        let md = config.protocol.stage("Md").unwrap().render().unwrap();
        assert!(md.contains("nstlim=50000000,\n"));
        assert!(md.contains("temp0=303.15,\n"));
    }

    #[test]
    fn equilibration_applies_temperature_length_and_extra_mask() {
        let args = equil_args(&[
            "--protein",
            "10",
            "--temp",
            "310",
            "--ns",
            "1",
            "--add-mask",
            ":LIG",
            "--charmm-water",
        ]);

        let config = build_equilibration_config(&args).unwrap();

        let step1 = config.protocol.stage("step1").unwrap();
        assert_eq!(step1.params().restraint_mask, "@CA,C,N,O|:LIG");
        assert!(step1.params().uses_charmm_water());
        let md = config.protocol.stage("Md").unwrap().render().unwrap();
        assert!(md.contains("nstlim=500000,\n"));
        assert!(md.contains("temp0=310.0,\n"));
    }

    #[test]
    fn equilibration_reads_system_file() {
        let dir = tempfile::tempdir().unwrap();
        let system_path = dir.path().join("system.toml");
        fs::write(&system_path, "protein = 80\nlipid = 20\n").unwrap();

        let args = equil_args(&["--system", system_path.to_str().unwrap()]);
        let config = build_equilibration_config(&args).unwrap();

        let step1 = config.protocol.stage("step1").unwrap();
        assert_eq!(step1.params().system.solute_residues(), 100);
    }

    #[test]
    fn equilibration_without_solute_is_rejected() {
        let result = build_equilibration_config(&equil_args(&[]));
        assert!(matches!(result, Err(CliError::Argument(_))));
    }

    #[test]
    fn equilibration_with_overflowing_length_is_rejected() {
        let ns = (u64::MAX / 100_000).to_string();
        let args = equil_args(&["--protein", "10", "--ns", ns.as_str()]);
        let result = build_equilibration_config(&args);
        assert!(matches!(
            result,
            Err(CliError::Stage(StageError::InvalidParameter {
                parameter: "nstlim",
                ..
            }))
        ));
    }
}
