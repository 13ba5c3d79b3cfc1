use std::process::ExitCode;

use clap::Parser;

use splatterboard::cli::{self, CliArgs};
use splatterboard::logger;

fn main() -> ExitCode {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let args = CliArgs::parse();
    cli::run(args)
}
