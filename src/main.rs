use clap::Parser;
use tidytree::cli::{Cli, run_cli};
use tidytree::output::OutputFormatter;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run_cli(&cli) {
        OutputFormatter::error(&e);
        std::process::exit(1);
    }
}
