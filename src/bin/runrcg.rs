use cowan::{
    cli::{self, StageArgs},
    program::Rcg,
};

fn main() {
    cli::init_logging();
    let args: StageArgs = cli::parse();
    std::process::exit(cli::run_stage(Rcg, &args));
}
