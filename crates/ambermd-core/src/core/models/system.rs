use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Read-only view of the simulated system consumed by every stage.
///
/// Stages only need residue counts per biomolecule category (to build the solute
/// selection `:1-N`) and whether the solvent uses CHARMM water naming. Implementors are
/// never mutated by a stage.
pub trait SystemInfo: fmt::Debug + Send + Sync {
    fn protein_residues(&self) -> usize;
    fn dna_residues(&self) -> usize;
    fn rna_residues(&self) -> usize;
    fn lipid_residues(&self) -> usize;
    fn carbohydrate_residues(&self) -> usize;
    fn has_charmm_water(&self) -> bool;

    /// Total number of biomolecule residues, i.e. the upper bound `N` of the solute
    /// residue range `1..N`.
    fn solute_residues(&self) -> usize {
        self.protein_residues()
            + self.dna_residues()
            + self.rna_residues()
            + self.lipid_residues()
            + self.carbohydrate_residues()
    }
}

/// Plain residue-count summary of a system, typically produced by an upstream topology
/// reader or written by hand in a TOML file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct SystemSummary {
    pub protein: usize,
    pub dna: usize,
    pub rna: usize,
    pub lipid: usize,
    pub carbohydrate: usize,
    pub charmm_water: bool,
}

impl SystemSummary {
    pub fn protein_only(residues: usize) -> Self {
        Self {
            protein: residues,
            ..Self::default()
        }
    }

    pub fn with_charmm_water(mut self, charmm_water: bool) -> Self {
        self.charmm_water = charmm_water;
        self
    }

    pub fn load(path: &Path) -> Result<Self, SystemInfoError> {
        let content = std::fs::read_to_string(path).map_err(|e| SystemInfoError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            SystemInfoError::Toml { source, .. } => SystemInfoError::Toml {
                path: path.to_string_lossy().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SystemInfoError> {
        toml::from_str(content).map_err(|e| SystemInfoError::Toml {
            path: "<string>".to_string(),
            source: e,
        })
    }
}

impl SystemInfo for SystemSummary {
    fn protein_residues(&self) -> usize {
        self.protein
    }

    fn dna_residues(&self) -> usize {
        self.dna
    }

    fn rna_residues(&self) -> usize {
        self.rna
    }

    fn lipid_residues(&self) -> usize {
        self.lipid
    }

    fn carbohydrate_residues(&self) -> usize {
        self.carbohydrate
    }

    fn has_charmm_water(&self) -> bool {
        self.charmm_water
    }
}

#[derive(Debug, Error)]
pub enum SystemInfoError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn solute_residues_sums_all_biomolecule_categories() {
        let system = SystemSummary {
            protein: 120,
            dna: 12,
            rna: 3,
            lipid: 40,
            carbohydrate: 5,
            charmm_water: false,
        };
        assert_eq!(system.solute_residues(), 180);
    }

    #[test]
    fn empty_summary_has_no_solute() {
        let system = SystemSummary::default();
        assert_eq!(system.solute_residues(), 0);
        assert!(!system.has_charmm_water());
    }

    #[test]
    fn parses_kebab_case_toml_with_missing_fields_defaulted() {
        let system = SystemSummary::from_toml_str(
            r#"
            protein = 250
            lipid = 64
            charmm-water = true
            "#,
        )
        .unwrap();
        assert_eq!(system.protein, 250);
        assert_eq!(system.lipid, 64);
        assert_eq!(system.dna, 0);
        assert!(system.has_charmm_water());
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = SystemSummary::from_toml_str("proteins = 3");
        assert!(matches!(result, Err(SystemInfoError::Toml { .. })));
    }

    #[test]
    fn load_reads_summary_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "protein = 10\ndna = 2").unwrap();

        let system = SystemSummary::load(file.path()).unwrap();
        assert_eq!(system, SystemSummary {
            protein: 10,
            dna: 2,
            ..SystemSummary::default()
        });
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");

        match SystemSummary::load(&missing) {
            Err(SystemInfoError::Io { path, .. }) => assert!(path.ends_with("absent.toml")),
            other => panic!("expected I/O error, got {:?}", other),
        }
    }

    #[test]
    fn load_reports_parse_errors_with_file_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "protein = \"many\"").unwrap();

        match SystemSummary::load(file.path()) {
            Err(SystemInfoError::Toml { path, .. }) => assert_ne!(path, "<string>"),
            other => panic!("expected TOML error, got {:?}", other),
        }
    }
}
