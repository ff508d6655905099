use clap::Parser;
use signalbridge::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
