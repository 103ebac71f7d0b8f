//! Tessera CLI binary.

use std::process;

use clap::Parser;
use tessera::cli::{args::TesseraArgs, commands::execute_command};

fn main() {
    let args = TesseraArgs::parse();

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
