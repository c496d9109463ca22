use crate::engine::error::StageError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::stage::Stage;
use crate::engine::stages::AnyStage;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// An ordered sequence of stages, each written to its own input file.
#[derive(Debug, Clone, Default)]
pub struct Protocol {
    stages: Vec<AnyStage>,
}

impl Protocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: impl Into<AnyStage>) -> &mut Self {
        self.stages.push(stage.into());
        self
    }

    pub fn stages(&self) -> &[AnyStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage(&self, name: &str) -> Option<&AnyStage> {
        self.stages.iter().find(|s| s.name() == name)
    }

    /// Two stages with the same name would write into the same file.
    pub fn check_unique_names(&self) -> Result<(), StageError> {
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name()) {
                return Err(StageError::DuplicateStageName {
                    name: stage.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<AnyStage> for Protocol {
    fn from_iter<I: IntoIterator<Item = AnyStage>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

/// Writes every stage of `protocol` into `output_dir` as `<name>.in`.
///
/// All stages are validated before the first file is written. Returns the written paths
/// in protocol order.
#[instrument(skip_all, name = "protocol_workflow")]
pub fn run(
    protocol: &Protocol,
    output_dir: &Path,
    reporter: &ProgressReporter,
) -> Result<Vec<PathBuf>, StageError> {
    protocol.check_unique_names()?;
    for stage in protocol.stages() {
        stage.validate()?;
    }

    std::fs::create_dir_all(output_dir).map_err(|source| StageError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    info!(
        "Writing {} stage(s) into {:?}",
        protocol.len(),
        output_dir
    );
    reporter.report(Progress::ProtocolStart {
        total_stages: protocol.len() as u64,
    });

    let mut written = Vec::with_capacity(protocol.len());
    for stage in protocol.stages() {
        let path = output_dir.join(stage.input_file_name());
        stage.run(&path)?;
        reporter.report(Progress::StageWritten {
            name: stage.name().to_string(),
            path: path.clone(),
        });
        written.push(path);
    }

    reporter.report(Progress::ProtocolFinish);
    info!("Protocol complete.");
    Ok(written)
}
