use clap::Parser;
use log::{info, warn};

mod args;
mod poll;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    info!("args: {:?}", args);

    let res = poll::run_poll(
        args.config.clone(),
        args.input.clone(),
        args.input_type.clone(),
        args.candidates.clone(),
        args.excel_worksheet_name.clone(),
        args.out.clone(),
        args.reference.clone(),
    );

    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        std::process::exit(1);
    }
}
