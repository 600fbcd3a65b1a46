use anyhow::Result;
use clap::Parser;
use covidmap::utils::{setup_logging, validate_args};
use covidmap::{generate_map, init_default_aliases, print_run_summary, Args};
use tracing::error;

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    if args.init {
        return init_default_aliases();
    }

    validate_args(&args)?;

    match generate_map(&args) {
        Ok(summary) => {
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            error!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
