//! Text output helpers for AMBER input files.

pub mod namelist;
