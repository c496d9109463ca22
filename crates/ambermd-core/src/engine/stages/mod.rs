//! Concrete stage types and the closed [`AnyStage`] set used by protocols.

pub mod dynamics;
pub mod minimization;

use self::dynamics::{NptStage, NvtStage};
use self::minimization::MinimizationStage;
use super::error::StageError;
use super::stage::{Stage, StageParams};
use std::io::{self, Write};

#[derive(Debug, Clone)]
pub enum AnyStage {
    Minimization(MinimizationStage),
    Nvt(NvtStage),
    Npt(NptStage),
}

impl AnyStage {
    fn inner(&self) -> &dyn Stage {
        match self {
            AnyStage::Minimization(stage) => stage,
            AnyStage::Nvt(stage) => stage,
            AnyStage::Npt(stage) => stage,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Stage {
        match self {
            AnyStage::Minimization(stage) => stage,
            AnyStage::Nvt(stage) => stage,
            AnyStage::Npt(stage) => stage,
        }
    }
}

impl Stage for AnyStage {
    fn params(&self) -> &StageParams {
        self.inner().params()
    }

    fn params_mut(&mut self) -> &mut StageParams {
        self.inner_mut().params_mut()
    }

    fn title(&self) -> &'static str {
        self.inner().title()
    }

    fn validate(&self) -> Result<(), StageError> {
        self.inner().validate()
    }

    fn effective_restraint_mask(&self) -> String {
        self.inner().effective_restraint_mask()
    }

    fn write_header(&self, out: &mut dyn Write) -> io::Result<()> {
        self.inner().write_header(out)
    }

    fn write_water_directive(&self, out: &mut dyn Write) -> io::Result<()> {
        self.inner().write_water_directive(out)
    }

    fn write_stage_fields(&self, out: &mut dyn Write) -> io::Result<()> {
        self.inner().write_stage_fields(out)
    }

    fn write_restraint_directive(&self, out: &mut dyn Write) -> io::Result<()> {
        self.inner().write_restraint_directive(out)
    }

    fn write_footer(&self, out: &mut dyn Write) -> io::Result<()> {
        self.inner().write_footer(out)
    }
}

impl From<MinimizationStage> for AnyStage {
    fn from(stage: MinimizationStage) -> Self {
        AnyStage::Minimization(stage)
    }
}

impl From<NvtStage> for AnyStage {
    fn from(stage: NvtStage) -> Self {
        AnyStage::Nvt(stage)
    }
}

impl From<NptStage> for AnyStage {
    fn from(stage: NptStage) -> Self {
        AnyStage::Npt(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::system::{SystemInfo, SystemSummary};
    use std::sync::Arc;

    fn system() -> Arc<dyn SystemInfo> {
        Arc::new(SystemSummary::protein_only(64))
    }

    #[test]
    fn delegates_rendering_to_the_wrapped_stage() {
        let mut min = MinimizationStage::new("step1", system());
        min.set_max_cycles(200);
        let expected = min.render().unwrap();

        let any = AnyStage::from(min);
        assert_eq!(any.title(), "Minimization");
        assert_eq!(any.render().unwrap(), expected);
    }

    #[test]
    fn base_setters_chain_through_the_enum() {
        let mut any: AnyStage = NvtStage::new("heat", system()).into();
        any.set_cutoff(12.0).set_restraint("@CA", 1.0);

        assert_eq!(any.params().cutoff, 12.0);
        assert_eq!(any.effective_restraint_mask(), "\":1-64&!@H=|:@CA\"");
        let text = any.render().unwrap();
        assert!(text.starts_with("NVT: heat\n"));
        assert!(text.contains("cut=12.0,\n"));
    }

    #[test]
    fn stage_specific_validation_is_preserved() {
        let mut min = MinimizationStage::new("bad", system());
        min.set_min_trust_region_steps(0);

        let any = AnyStage::from(min);
        assert!(matches!(
            any.validate(),
            Err(StageError::InvalidParameter {
                parameter: "ntmin",
                ..
            })
        ));
    }

    #[test]
    fn npt_variant_reports_its_title() {
        let any = AnyStage::from(NptStage::new("md", system()));
        assert_eq!(any.title(), "NPT");
        assert_eq!(any.input_file_name(), "md.in");
    }
}
