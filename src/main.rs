use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Arc;

use adpwtest::{
    run_check, CheckError, CliArgs, Ldaps, LogDetail, LogOptions, TestTarget,
};
use clap::Parser;
use tracing::Level;

const LOG_FILE: &str = "ldap.log";

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let log = LogOptions::new(args.log, LogDetail::Extended);
    if log.enabled {
        if let Err(e) = init_protocol_log(log) {
            println!("ERROR: {e}");
            return ExitCode::from(2);
        }
    }

    let target = match TestTarget::from_file(&args.conf, args.test.as_deref()) {
        Ok(target) => target,
        Err(e) => {
            println!("ERROR: configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    let directory = Ldaps::new(log);
    match run_check(&directory, &target, args.dump_entry) {
        Ok(()) => {
            println!("OK");
            ExitCode::SUCCESS
        }
        Err(CheckError::Connection(e)) => {
            println!("ERROR: {e}");
            ExitCode::from(2)
        }
        Err(CheckError::Failed(e)) => {
            println!("FAILED\n{e}");
            ExitCode::from(1)
        }
    }
}

/// Appends the protocol log to a fixed file next to the working
/// directory, plain text without ANSI escapes.
fn init_protocol_log(log: LogOptions) -> Result<(), String> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .map_err(|e| format!("log file \"{LOG_FILE}\" could not be opened: {e}"))?;

    let level = match log.detail {
        LogDetail::Basic => Level::DEBUG,
        LogDetail::Extended => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();
    Ok(())
}
