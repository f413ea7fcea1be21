use cowan::cli::{self, PipelineArgs};

fn main() {
    cli::init_logging();
    let args: PipelineArgs = cli::parse();
    std::process::exit(cli::run_pipeline(&args));
}
