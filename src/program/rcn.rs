use super::{Family, Program};

/// Rcn is the Hartree-Fock stage. It reads `<name>.rcn` and writes
/// `<name>.rcn_out`, leaving `FTN02` behind for [super::Rcn2]
#[derive(Clone, Copy, Debug, Default)]
pub struct Rcn;

impl Program for Rcn {
    const EXECUTABLE: &'static str = "rcn";

    const FAMILY: Family = Family::Cowan;

    const INPUT_EXT: &'static str = "rcn";

    const OUTPUTS: &'static [(&'static str, &'static str)] =
        &[("fort.9", "rcn_out")];

    const REMOVES_FTN02: bool = false;
}
