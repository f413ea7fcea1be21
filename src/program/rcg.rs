use super::{Family, Program};

/// Rcg wraps `ttrcg`, which needs the fractional-parentage tables shipped with
/// the installation in slots 72 to 74 in addition to `<name>.rcg`
#[derive(Clone, Copy, Debug, Default)]
pub struct Rcg;

impl Program for Rcg {
    const EXECUTABLE: &'static str = "ttrcg";

    const FAMILY: Family = Family::Ttmult;

    const INPUT_EXT: &'static str = "rcg";

    const OUTPUTS: &'static [(&'static str, &'static str)] =
        &[("fort.9", "rcg_out"), ("fort.14", "rcg_rme")];

    const AUXILIARY: &'static [(&'static str, &'static str)] = &[
        ("rcg_cfp72", "fort.72"),
        ("rcg_cfp73", "fort.73"),
        ("rcg_cfp74", "fort.74"),
    ];
}
