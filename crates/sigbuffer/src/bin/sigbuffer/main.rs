use std::error::Error;
use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;
use sigbuffer::config::Cli;
use sigbuffer::error::EXIT_SETUP_FAILURE;
use sigbuffer::{telemetry, SupervisorError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let settings = match Cli::parse().into_settings() {
		Ok(s) => s,
		Err(e) => return fail(&SupervisorError::from(e), None),
	};

	if let Err(e) = telemetry::init(&settings.log) {
		return fail(&e, Some(EXIT_SETUP_FAILURE));
	}

	tracing::debug!(?settings, "starting");
	match sigbuffer::supervise(&settings.child, &settings.options).await {
		Ok(outcome) => {
			tracing::debug!(%outcome, "done");
			ExitCode::from(outcome.code())
		}
		Err(e) => {
			tracing::error!("{}", e);
			fail(&e, None)
		}
	}
}

fn fail(err: &(dyn Error + 'static), code: Option<u8>) -> ExitCode {
	// Error messages already carry their underlying cause.
	let message = err.to_string();
	if std::io::stderr().is_terminal() {
		eprintln!("{} {} {}", "sigbuffer:".bold(), "error:".red().bold(), message);
	} else {
		eprintln!("sigbuffer: error: {}", message);
	}

	let code = code.unwrap_or_else(|| {
		err.downcast_ref::<SupervisorError>()
			.map_or(EXIT_SETUP_FAILURE, SupervisorError::exit_code)
	});
	ExitCode::from(code)
}
