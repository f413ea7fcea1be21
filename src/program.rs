use std::{fmt::Display, path::Path, str::FromStr};

use crate::config::Config;

pub mod rcg;
pub mod rcn;
pub mod rcn2;

pub use rcg::Rcg;
pub use rcn::Rcn;
pub use rcn2::Rcn2;

/// the file `rcn` leaves behind for `rcn2`
pub const FTN02: &str = "FTN02";

/// the logical name from which every `<name>.<ext>` file of a run is derived
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunName(String);

impl RunName {
    /// `<name>.<ext>`
    pub fn with_ext(&self, ext: &str) -> String {
        format!("{}.{ext}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunName {
    fn default() -> Self {
        Self(String::from("input"))
    }
}

impl Display for RunName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a run name has to name a file in the working directory, so it can't be
/// empty, contain a separator, or point somewhere else
impl FromStr for RunName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "." || s == ".." {
            return Err(format!("invalid run name `{s}`"));
        }
        if s.contains(std::path::is_separator) {
            return Err(format!("run name `{s}` contains a path separator"));
        }
        Ok(Self(s.to_owned()))
    }
}

/// the two installation directories the programs are found in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    /// `rcn` and `rcn2`, found in [Config::cowan_dir]
    Cowan,
    /// `ttrcg`, found in [Config::ttmult_dir]
    Ttmult,
}

impl Family {
    pub fn dir<'a>(&self, config: &'a Config) -> &'a Path {
        match self {
            Family::Cowan => &config.cowan_dir,
            Family::Ttmult => &config.ttmult_dir,
        }
    }
}

/// Program describes the files one of Cowan's programs expects. Everything is
/// fixed by the program itself, so the trait only carries constants and the
/// actual protocol lives in [crate::stage::Stage].
pub trait Program {
    /// the name of the executable inside its [Family] directory
    const EXECUTABLE: &'static str;

    const FAMILY: Family;

    /// the extension of the named input, linked into [Program::INPUT_SLOT]
    const INPUT_EXT: &'static str;

    const INPUT_SLOT: &'static str = "fort.10";

    /// (slot, extension) pairs promoted to `<name>.<extension>` on success, in
    /// the order they are reported
    const OUTPUTS: &'static [(&'static str, &'static str)];

    /// (file in the [Family] directory, slot) pairs copied before running
    const AUXILIARY: &'static [(&'static str, &'static str)] = &[];

    /// whether to remove [FTN02] after a successful run
    const REMOVES_FTN02: bool = true;

    /// Return the input filename for `name`
    fn infile(name: &RunName) -> String {
        name.with_ext(Self::INPUT_EXT)
    }

    /// Return the output filenames for `name` in the order of
    /// [Program::OUTPUTS]
    fn outfiles(name: &RunName) -> Vec<String> {
        Self::OUTPUTS
            .iter()
            .map(|(_, ext)| name.with_ext(ext))
            .collect()
    }

    /// Return all the slot filenames touched by the program, except [FTN02]
    fn slots() -> Vec<&'static str> {
        let mut ret = vec![Self::INPUT_SLOT];
        ret.extend(Self::AUXILIARY.iter().map(|(_, slot)| *slot));
        ret.extend(Self::OUTPUTS.iter().map(|(slot, _)| *slot));
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_name() {
        let name: RunName = "sample".parse().unwrap();
        assert_eq!(name.with_ext("rcn_out"), "sample.rcn_out");
        assert_eq!(RunName::default().to_string(), "input");

        for bad in ["", ".", "..", "a/b"] {
            assert!(bad.parse::<RunName>().is_err(), "{bad:?} parsed");
        }
    }

    #[test]
    fn file_names() {
        let name = RunName::default();
        assert_eq!(Rcn::infile(&name), "input.rcn");
        assert_eq!(Rcn::outfiles(&name), ["input.rcn_out"]);
        assert_eq!(Rcn2::outfiles(&name), ["input.rcn2_out", "input.rcg"]);
        assert_eq!(Rcg::infile(&name), "input.rcg");
        assert_eq!(Rcg::outfiles(&name), ["input.rcg_out", "input.rcg_rme"]);
    }

    #[test]
    fn slots() {
        assert_eq!(Rcn::slots(), ["fort.10", "fort.9"]);
        assert_eq!(Rcn2::slots(), ["fort.10", "fort.9", "fort.11"]);
        assert_eq!(
            Rcg::slots(),
            ["fort.10", "fort.72", "fort.73", "fort.74", "fort.9", "fort.14"]
        );
    }

    #[test]
    fn family_dir() {
        let config = Config::new("/cowan", "/ttmult");
        assert_eq!(Rcn::FAMILY.dir(&config), Path::new("/cowan"));
        assert_eq!(Rcn2::FAMILY.dir(&config), Path::new("/cowan"));
        assert_eq!(Rcg::FAMILY.dir(&config), Path::new("/ttmult"));
    }
}
