//! argument handling shared by the binaries

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::info;

use crate::{
    config::{Config, ConfigError},
    pipeline::{remove_calculation_files, Pipeline},
    program::{Program, RunName},
    stage::Stage,
};

#[derive(Args, Debug, Default)]
pub struct CommonArgs {
    /// JSON file with `cowan_dir` and `ttmult_dir`. defaults to the COWAN_DIR
    /// and TTMULT environment variables
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// run in DIR instead of the current directory
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

impl CommonArgs {
    pub fn config(&self) -> Result<Config, ConfigError> {
        let config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::from_env()?,
        };
        Ok(match &self.dir {
            Some(dir) => config.with_work_dir(dir),
            None => config,
        })
    }
}

/// arguments for `runrcn`, `runrcn2` and `runrcg`
#[derive(Parser, Debug)]
#[command(version)]
pub struct StageArgs {
    /// run name. the input is read from NAME.<ext>
    #[arg(default_value = "input")]
    pub name: RunName,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// arguments for `cowan`
#[derive(Parser, Debug)]
#[command(version, about = "run rcn, rcn2, and ttrcg in sequence")]
pub struct PipelineArgs {
    #[command(subcommand)]
    pub command: PipelineCommand,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Subcommand, Debug)]
pub enum PipelineCommand {
    /// run the stages on NAME.rcn
    Run {
        #[arg(default_value = "input")]
        name: RunName,

        /// stop after rcn
        #[arg(long)]
        rcn_only: bool,
    },

    /// remove NAME.* and FTN02
    Clean {
        #[arg(default_value = "input")]
        name: RunName,
    },
}

/// parse the command line like [Parser::parse], but exit with status 1 on a
/// usage error
pub fn parse<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    }
}

/// log to stderr at `info` unless RUST_LOG says otherwise
pub fn init_logging() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp(None)
    .init();
}

/// run a single stage and return the exit code
pub fn run_stage<P: Program>(program: P, args: &StageArgs) -> i32 {
    let config = match args.common.config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {e}", P::EXECUTABLE);
            return 1;
        }
    };
    let mut stage = Stage::new(program, config);
    match stage.run(&args.name) {
        Ok(output) => {
            for file in output.outputs {
                info!("wrote {}", file.display());
            }
            0
        }
        Err(e) => {
            eprintln!("{}: {e}", P::EXECUTABLE);
            1
        }
    }
}

/// run `cowan` and return the exit code
pub fn run_pipeline(args: &PipelineArgs) -> i32 {
    let config = match args.common.config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("cowan: {e}");
            return 1;
        }
    };
    let res = match &args.command {
        PipelineCommand::Run { name, rcn_only } => {
            Pipeline::new(config).run(name, *rcn_only)
        }
        PipelineCommand::Clean { name } => {
            remove_calculation_files(&config.work_dir, name)
        }
    };
    match res {
        Ok(files) => {
            for file in files {
                info!("{}", file.display());
            }
            0
        }
        Err(e) => {
            eprintln!("cowan: {e}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{program::Rcn, tests::Fixture};

    use super::*;

    fn common(fixture: &Fixture) -> CommonArgs {
        let path = fixture.install.path().join("cowan.json");
        let json = serde_json::to_string(&Config::unified(
            fixture.install.path(),
        ))
        .unwrap();
        std::fs::write(&path, json).unwrap();
        CommonArgs {
            config: Some(path),
            dir: Some(fixture.work().to_owned()),
        }
    }

    #[test]
    fn parse_stage_args() {
        let args = StageArgs::try_parse_from(["runrcn"]).unwrap();
        assert_eq!(args.name, RunName::default());
        assert!(args.common.config.is_none());

        let args =
            StageArgs::try_parse_from(["runrcn", "-C", "/tmp", "sample"])
                .unwrap();
        assert_eq!(args.name.as_str(), "sample");
        assert_eq!(args.common.dir, Some(PathBuf::from("/tmp")));

        assert!(StageArgs::try_parse_from(["runrcn", "a", "b"]).is_err());
        assert!(StageArgs::try_parse_from(["runrcn", "a/b"]).is_err());
    }

    #[test]
    fn parse_pipeline_args() {
        let args =
            PipelineArgs::try_parse_from(["cowan", "run", "--rcn-only"])
                .unwrap();
        match args.command {
            PipelineCommand::Run { name, rcn_only } => {
                assert_eq!(name, RunName::default());
                assert!(rcn_only);
            }
            c => panic!("expected Run, got {c:?}"),
        }
        assert!(PipelineArgs::try_parse_from(["cowan"]).is_err());
    }

    #[test]
    fn stage_exit_codes() {
        let fixture = Fixture::new();
        let args = StageArgs {
            name: RunName::default(),
            common: common(&fixture),
        };
        assert_eq!(run_stage(Rcn, &args), 1);
        assert!(fixture.listing().is_empty());

        fixture.write("input.rcn", "rcn input\n");
        assert_eq!(run_stage(Rcn, &args), 0);
        assert!(fixture.work().join("input.rcn_out").exists());
        assert!(!fixture.work().join("fort.10").exists());
    }

    #[test]
    fn pipeline_exit_codes() {
        let fixture = Fixture::new();
        fixture.write("input.rcn", "rcn input\n");
        let run = PipelineArgs {
            command: PipelineCommand::Run {
                name: RunName::default(),
                rcn_only: false,
            },
            common: common(&fixture),
        };
        assert_eq!(run_pipeline(&run), 0);
        assert!(fixture.work().join("input.rcg_rme").exists());

        let clean = PipelineArgs {
            command: PipelineCommand::Clean {
                name: RunName::default(),
            },
            common: common(&fixture),
        };
        assert_eq!(run_pipeline(&clean), 0);
        assert!(fixture.listing().is_empty());

        // nothing to start from
        assert_eq!(run_pipeline(&run), 1);
    }

    #[test]
    fn bad_config() {
        let fixture = Fixture::new();
        let args = StageArgs {
            name: RunName::default(),
            common: CommonArgs {
                config: Some(fixture.work().join("missing.json")),
                dir: None,
            },
        };
        assert_eq!(run_stage(Rcn, &args), 1);
    }
}
