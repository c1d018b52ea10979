use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use trackgeff::GeffError;

fn exit_code(err: &GeffError) -> u8 {
    match err {
        GeffError::ValidationFailed { .. } => 2,
        _ => 1,
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match trackgeff::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}
