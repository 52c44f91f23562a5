//! `apiweave` binary entry point.

use apiweave_cli::{Args, init_tracing, run, run_cli_async};
use clap::Parser;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing();
    let code = run_cli_async(|| run(args)).await;
    std::process::exit(code);
}
