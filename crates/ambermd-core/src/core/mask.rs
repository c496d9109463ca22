//! Restraint mask grammar.
//!
//! Positional restraints are expressed as AMBER atom-selection masks. Every stage restrains
//! relative to the solute, which occupies residues `1..N` where `N` is the number of
//! biomolecule residues reported by [`SystemInfo`](crate::core::models::system::SystemInfo).

/// Selection of all non-hydrogen solute atoms, quoted for the namelist.
///
/// Produces `":1-N!@H="`.
pub fn solute_heavy_atoms(solute_residues: usize) -> String {
    format!("\":1-{}!@H=\"", solute_residues)
}

/// Combines the solute heavy-atom selection with a user supplied mask.
///
/// Produces `":1-N&!@H=|:<mask>"`. The user mask is inserted verbatim.
pub fn combined_with_solute(solute_residues: usize, mask: &str) -> String {
    format!("\":1-{}&!@H=|:{}\"", solute_residues, mask)
}

/// Effective restraint mask for a raw user mask.
///
/// An empty raw mask yields the solute heavy-atom selection, anything else is combined
/// with it. The raw mask is never modified, so the result only depends on the inputs.
pub fn compose_restraint_mask(raw_mask: &str, solute_residues: usize) -> String {
    if raw_mask.is_empty() {
        solute_heavy_atoms(solute_residues)
    } else {
        combined_with_solute(solute_residues, raw_mask)
    }
}
