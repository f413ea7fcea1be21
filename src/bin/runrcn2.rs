use cowan::{
    cli::{self, StageArgs},
    program::Rcn2,
};

fn main() {
    cli::init_logging();
    let args: StageArgs = cli::parse();
    std::process::exit(cli::run_stage(Rcn2, &args));
}
