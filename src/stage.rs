use std::{
    fs, io,
    marker::PhantomData,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Output, Stdio},
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    config::Config,
    lock::{DirLock, LockError},
    program::{Program, RunName, FTN02},
    slot::{remove_stale, Slot},
};


/// number of trailing lines of program output kept in [StageError::Execution]
const DIAGNOSTIC_LINES: usize = 20;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("{program} not found: {path} is not an executable file")]
    ToolNotFound { program: &'static str, path: PathBuf },

    #[error("{program} auxiliary file {path} not found")]
    AuxiliaryNotFound { program: &'static str, path: PathBuf },

    #[error("input file {path} not found")]
    InputNotFound { path: PathBuf },

    #[error("{program} did not finish successfully: {status}{diagnostics}")]
    Execution {
        program: &'static str,
        status: ExitStatus,
        /// the tail of stderr, or of stdout if stderr was empty, prefixed
        /// with a newline. empty if the program printed nothing
        diagnostics: String,
    },

    #[error("{program} exited successfully but did not write {slot}")]
    MissingOutput { program: &'static str, slot: PathBuf },

    #[error("{dir} is in use by another run ({holder})")]
    Busy { dir: PathBuf, holder: String },

    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// take the working directory lock, reporting a held lock as
/// [StageError::Busy]
pub(crate) fn lock_dir(dir: &Path) -> Result<DirLock, StageError> {
    DirLock::acquire(dir).map_err(|e| match e {
        LockError::Held(holder) => StageError::Busy {
            dir: dir.to_owned(),
            holder,
        },
        LockError::Io(source) => StageError::Io {
            path: dir.to_owned(),
            source,
        },
    })
}

impl StageError {
    fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    fn execution(program: &'static str, output: &Output) -> Self {
        let text = if output.stderr.iter().all(u8::is_ascii_whitespace) {
            &output.stdout
        } else {
            &output.stderr
        };
        let text = String::from_utf8_lossy(text);
        let lines: Vec<_> = text.lines().collect();
        let tail = &lines[lines.len().saturating_sub(DIAGNOSTIC_LINES)..];
        let mut diagnostics = String::new();
        for line in tail {
            diagnostics.push('\n');
            diagnostics.push_str(line);
        }
        Self::Execution {
            program,
            status: output.status,
            diagnostics,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum State {
    NotStarted,
    StagingInputs,
    Invoking,
    /// the promoted output files, in [Program::OUTPUTS] order
    Succeeded(Vec<PathBuf>),
    /// terminal. nothing was promoted and the slots were removed
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageOutput {
    pub outputs: Vec<PathBuf>,
}

/// Stage runs a single [Program] in [Config::work_dir] using the fixed-slot
/// protocol:
///
/// 1. check that the executable, any auxiliary files, and `<name>.<ext>` exist
/// 2. lock the working directory
/// 3. link the input and copy the auxiliary files into their slots
/// 4. run the program and wait for it
/// 5. on success, rename every output slot to `<name>.<ext>`
///
/// Every slot is removed again on all exit paths. Only one Stage may run in a
/// working directory at a time, which the lock enforces among Stages but not
/// against other processes touching the `fort.*` files.
#[derive(Debug)]
pub struct Stage<P: Program> {
    program: PhantomData<P>,
    config: Config,
    state: State,
}

impl<P: Program> Stage<P> {
    pub fn new(_program: P, config: Config) -> Self {
        Self {
            program: PhantomData,
            config,
            state: State::NotStarted,
        }
    }

    /// the state reached by the last call to [Stage::run]
    pub fn state(&self) -> &State {
        &self.state
    }

    fn transition(&mut self, state: State) {
        debug!("{}: {:?} -> {:?}", P::EXECUTABLE, self.state, state);
        self.state = state;
    }

    /// the absolute path of the executable
    pub fn executable(&self) -> Result<PathBuf, StageError> {
        let path = P::FAMILY.dir(&self.config).join(P::EXECUTABLE);
        if !is_executable(&path) {
            return Err(StageError::ToolNotFound {
                program: P::EXECUTABLE,
                path,
            });
        }
        // the program runs in work_dir, so a relative path would break
        fs::canonicalize(&path).map_err(StageError::io(path))
    }

    fn auxiliary(&self) -> Result<Vec<PathBuf>, StageError> {
        let dir = P::FAMILY.dir(&self.config);
        let mut ret = Vec::with_capacity(P::AUXILIARY.len());
        for (file, _) in P::AUXILIARY {
            let path = dir.join(file);
            if !path.is_file() {
                return Err(StageError::AuxiliaryNotFound {
                    program: P::EXECUTABLE,
                    path,
                });
            }
            ret.push(path);
        }
        Ok(ret)
    }

    /// run the program on `<name>.<P::INPUT_EXT>`. nothing is written to the
    /// working directory if the executable, auxiliary files, or input are
    /// missing
    pub fn run(&mut self, name: &RunName) -> Result<StageOutput, StageError> {
        self.run_with(name, true)
    }

    /// like [Stage::run], but the caller already holds the lock on
    /// [Config::work_dir]
    pub(crate) fn run_locked(
        &mut self,
        name: &RunName,
    ) -> Result<StageOutput, StageError> {
        self.run_with(name, false)
    }

    fn run_with(
        &mut self,
        name: &RunName,
        lock: bool,
    ) -> Result<StageOutput, StageError> {
        self.state = State::NotStarted;
        match self.try_run(name, lock) {
            Ok(output) => {
                self.transition(State::Succeeded(output.outputs.clone()));
                Ok(output)
            }
            Err(e) => {
                self.transition(State::Failed);
                Err(e)
            }
        }
    }

    fn try_run(
        &mut self,
        name: &RunName,
        lock: bool,
    ) -> Result<StageOutput, StageError> {
        let exe = self.executable()?;
        let aux = self.auxiliary()?;
        let dir = self.config.work_dir.clone();
        let infile = P::infile(name);
        if !dir.join(&infile).is_file() {
            return Err(StageError::InputNotFound {
                path: dir.join(infile),
            });
        }

        let _lock = if lock { Some(lock_dir(&dir)?) } else { None };

        self.transition(State::StagingInputs);
        let slot_path = dir.join(P::INPUT_SLOT);
        // relative target, resolved against work_dir
        let input = Slot::link(&infile, slot_path.clone())
            .map_err(StageError::io(slot_path))?;
        let mut aux_slots = Vec::with_capacity(aux.len());
        for (source, (_, slot)) in aux.iter().zip(P::AUXILIARY) {
            let slot_path = dir.join(slot);
            aux_slots.push(
                Slot::copy(source, slot_path.clone())
                    .map_err(StageError::io(slot_path))?,
            );
        }
        let mut outputs = Vec::with_capacity(P::OUTPUTS.len());
        for (slot, _) in P::OUTPUTS {
            let slot_path = dir.join(slot);
            outputs.push(
                Slot::output(slot_path.clone())
                    .map_err(StageError::io(slot_path))?,
            );
        }

        self.transition(State::Invoking);
        invoke(P::EXECUTABLE, &exe, &dir)?;

        // check everything before renaming anything, so a missing output
        // doesn't leave the run half promoted
        if let Some(slot) = outputs.iter().find(|slot| !slot.exists()) {
            return Err(StageError::MissingOutput {
                program: P::EXECUTABLE,
                slot: slot.path().to_owned(),
            });
        }
        let mut promoted: Vec<PathBuf> = Vec::with_capacity(outputs.len());
        for (slot, file) in outputs.into_iter().zip(P::outfiles(name)) {
            let dest = dir.join(file);
            if let Err(e) = slot.promote(&dest) {
                // a failed stage promotes nothing
                for path in &promoted {
                    if let Err(e) = remove_stale(path) {
                        warn!("failed to remove {}: {e}", path.display());
                    }
                }
                return Err(StageError::Io {
                    path: dest,
                    source: e,
                });
            }
            promoted.push(dest);
        }

        // the outputs are in place, so cleanup failures only get logged
        let mut leftovers = vec![input];
        leftovers.extend(aux_slots);
        for slot in leftovers {
            let path = slot.path().to_owned();
            if let Err(e) = slot.release() {
                warn!("failed to remove {}: {e}", path.display());
            }
        }
        if P::REMOVES_FTN02 {
            let ftn02 = dir.join(FTN02);
            if let Err(e) = remove_stale(&ftn02) {
                warn!("failed to remove {}: {e}", ftn02.display());
            }
        }

        Ok(StageOutput { outputs: promoted })
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::{ffi::CString, os::unix::ffi::OsStrExt};
    if !path.is_file() {
        return false;
    }
    let Ok(c) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(c.as_ptr(), libc::X_OK) == 0 }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// spawn `exe` in `dir` and wait for it. stdout and stderr are captured and
/// only reported if the program fails
fn invoke(
    program: &'static str,
    exe: &Path,
    dir: &Path,
) -> Result<(), StageError> {
    let now = Instant::now();
    let output = spawn_and_wait(exe, dir).map_err(StageError::io(exe))?;
    if !output.status.success() {
        return Err(StageError::execution(program, &output));
    }
    info!(
        "finished {program} after {:.1} s",
        now.elapsed().as_millis() as f64 / 1000.0
    );
    Ok(())
}

/// ETXTBSY can be returned spuriously when another thread is writing an
/// executable while we fork, so try a few times before giving up
fn spawn_and_wait(exe: &Path, dir: &Path) -> io::Result<Output> {
    const ATTEMPTS: usize = 5;
    let mut attempt = 1;
    loop {
        let res = Command::new(exe)
            .current_dir(dir)
            .stdin(Stdio::null())
            .output();
        match res {
            Err(e) if is_text_busy(&e) && attempt < ATTEMPTS => {
                debug!("{} busy, retrying", exe.display());
                attempt += 1;
                thread::sleep(Duration::from_millis(50));
            }
            res => return res,
        }
    }
}

#[cfg(unix)]
fn is_text_busy(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::ETXTBSY)
}

#[cfg(not(unix))]
fn is_text_busy(_: &io::Error) -> bool {
    false
}
