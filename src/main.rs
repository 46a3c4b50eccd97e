use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use log::debug;

use craftmap::config::{Args, Config};
use craftmap::process::process_file;

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    // Like the original tool: called without files, print usage and fail.
    if args.files.is_empty() {
        let _ = Args::command().print_help();
        return ExitCode::FAILURE;
    }

    let config = Config::from_args(&args);
    debug!("config: {:?}", config);

    // One bad file never aborts the batch; it is reported and the exit
    // status reflects that something failed.
    let mut failed = false;
    for path in &args.files {
        if let Err(err) = process_file(path, &config) {
            eprintln!("{}: {:#}", path.display(), err);
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
