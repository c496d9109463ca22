//! # AmberMD Input Library
//!
//! Generates AMBER `&cntrl` namelist input files for staged molecular-dynamics protocols.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** The [`SystemInfo`](core::models::system::SystemInfo)
//!   contract describing the simulated system, the restraint mask grammar and namelist
//!   text formatting.
//!
//! - **[`engine`]: The Stages.** The [`Stage`](engine::stage::Stage) trait with its fixed
//!   write sequence, the minimization and dynamics stages, errors and progress events.
//!
//! - **[`workflows`]: The Public API.** Protocols that write several stages at once,
//!   including the standard equilibration preset.
//!
//! ## Example
//!
//! ```no_run
//! use ambermd::core::models::system::SystemSummary;
//! use ambermd::engine::stage::Stage;
//! use ambermd::engine::stages::minimization::MinimizationStage;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let system = Arc::new(SystemSummary::protein_only(250));
//! let mut min = MinimizationStage::new("step1", system);
//! min.set_restraint("@CA,C,N,O", 5.0).set_max_cycles(2000);
//! min.run(Path::new("step1.in")).unwrap();
//! ```

pub mod core;
pub mod engine;
pub mod workflows;
