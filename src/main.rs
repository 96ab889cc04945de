use std::process::ExitCode;

use clap::Parser;
use envapply::{
    EnvapplyError, JsonFileStore, Processor, RunAction, RunArgs, SettingsStore, WriterSink,
    load_run_config,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = RunArgs::parse();
    init_tracing(args.log_level());

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: RunArgs) -> Result<(), EnvapplyError> {
    let overrides = args.overrides();
    let config = load_run_config(args.config.as_deref(), overrides)?;
    let action = args.into_action();

    let mut processor = Processor::from_config(&config)?.with_output(WriterSink::stdout());
    let mut store = match (&config.store, action) {
        (Some(path), RunAction::Apply) => Some(JsonFileStore::open(path)?),
        _ => None,
    };
    processor.run(
        action,
        store.as_mut().map(|s| s as &mut dyn SettingsStore),
    )?;
    if action == RunAction::Check {
        println!("{} handler(s) checked", processor.registry().len());
    }
    Ok(())
}
