use std::{
    fs::{self, read_dir, read_to_string},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use log::{debug, info};
use regex::Regex;

use crate::{
    config::Config,
    lock::LOCK_FILE,
    program::{Program, Rcg, Rcn, Rcn2, RunName, FTN02},
    slot::remove_stale,
    stage::{lock_dir, Stage, StageError},
};

/// control cards for `rcn2`. the trailing spaces are part of the format
pub const RCN2_INPUT: &str = "G5INP     000                 00        00000000  9999999999 .00       1229
        -1
    ";

static RCG_CARD: OnceLock<Regex> = OnceLock::new();

/// write [RCN2_INPUT] to `<name>.rcn2` in `dir`
pub fn write_rcn2_input(
    dir: &Path,
    name: &RunName,
) -> Result<PathBuf, StageError> {
    let path = dir.join(Rcn2::infile(name));
    fs::write(&path, RCN2_INPUT).map_err(|source| StageError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// rewrite the `80998080` control field `rcn2` writes into the rcg input as
/// `99999999` in place. returns the number of replacements
pub fn fix_rcg_input(path: &Path) -> Result<usize, StageError> {
    let io = |source| StageError::Io {
        path: path.to_owned(),
        source,
    };
    let contents = read_to_string(path).map_err(io)?;
    let re = RCG_CARD.get_or_init(|| Regex::new("80998080").unwrap());
    let count = re.find_iter(&contents).count();
    if count > 0 {
        let fixed = re.replace_all(&contents, "99999999");
        fs::write(path, fixed.as_bytes()).map_err(io)?;
    }
    debug!("fixed {count} control fields in {}", path.display());
    Ok(count)
}

/// remove every `<name>.*` file in `dir` together with [FTN02], returning the
/// names of the files that were actually removed. the directory is locked
/// for the duration, so this fails with [StageError::Busy] during a run
pub fn remove_calculation_files(
    dir: &Path,
    name: &RunName,
) -> Result<Vec<PathBuf>, StageError> {
    let io = |path: &Path| {
        let path = path.to_owned();
        move |source| StageError::Io { path, source }
    };
    let _lock = lock_dir(dir)?;
    let prefix = format!("{name}.");
    let mut files = Vec::new();
    for entry in read_dir(dir).map_err(io(dir))? {
        let entry = entry.map_err(io(dir))?;
        let path = entry.path();
        let is_file = entry.file_type().map_err(io(path.as_path()))?.is_file();
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if is_file && file_name != LOCK_FILE && file_name.starts_with(&prefix)
        {
            files.push(path);
        }
    }
    files.sort();
    let ftn02 = dir.join(FTN02);
    if ftn02.symlink_metadata().is_ok() {
        files.push(ftn02);
    }
    for file in &files {
        remove_stale(file).map_err(io(file.as_path()))?;
    }
    info!("removed {} files", files.len());
    Ok(files)
}

/// Pipeline runs the stages in order, staging the input of each from the
/// output of the one before. the caller provides `<name>.rcn`. the working
/// directory stays locked from the first stage to the last
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// run `rcn` and, unless `rcn_only` is set, `rcn2` and `ttrcg`. returns
    /// the output files of every stage that ran. the first failing stage stops
    /// the pipeline
    pub fn run(
        &self,
        name: &RunName,
        rcn_only: bool,
    ) -> Result<Vec<PathBuf>, StageError> {
        let dir = &self.config.work_dir;
        let _lock = lock_dir(dir)?;
        let mut outputs =
            Stage::new(Rcn, self.config.clone()).run_locked(name)?.outputs;
        if rcn_only {
            return Ok(outputs);
        }

        write_rcn2_input(dir, name)?;
        let rcn2 = Stage::new(Rcn2, self.config.clone()).run_locked(name)?;
        outputs.extend(rcn2.outputs);

        fix_rcg_input(&dir.join(Rcg::infile(name)))?;
        let rcg = Stage::new(Rcg, self.config.clone()).run_locked(name)?;
        outputs.extend(rcg.outputs);

        Ok(outputs)
    }
}
