use clap::Parser;
use rhythmsphere::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
