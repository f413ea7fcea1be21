use super::{Family, Program};

/// Rcn2 turns the radial integrals left by [super::Rcn] into the input for
/// [super::Rcg]. `fort.11` is promoted to `<name>.rcg`
#[derive(Clone, Copy, Debug, Default)]
pub struct Rcn2;

impl Program for Rcn2 {
    const EXECUTABLE: &'static str = "rcn2";

    const FAMILY: Family = Family::Cowan;

    const INPUT_EXT: &'static str = "rcn2";

    const OUTPUTS: &'static [(&'static str, &'static str)] =
        &[("fort.9", "rcn2_out"), ("fort.11", "rcg")];
}
