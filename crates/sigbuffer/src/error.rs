use std::io;

use nix::sys::signal::Signal;
use thiserror::Error;

use crate::types::ChannelId;

/// Exit code for supervisor-internal failures.
pub const EXIT_SETUP_FAILURE: u8 = 125;
/// The command exists but could not be executed.
pub const EXIT_NOT_EXECUTABLE: u8 = 126;
/// The command could not be found.
pub const EXIT_NOT_FOUND: u8 = 127;
/// Invalid invocation, matching clap's own usage exit code.
pub const EXIT_USAGE: u8 = 2;

/// Invalid settings rejected before anything is started.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
	#[error("no command given")]
	EmptyCommand,
	#[error("attach and detach cannot both use {signal}")]
	SameSignal { signal: Signal },
	#[error("{signal} cannot be used as a control signal")]
	ReservedSignal { signal: Signal },
	#[error("chunk size must be greater than zero")]
	ZeroChunkSize,
	#[error("invalid signal '{0}'")]
	UnknownSignal(String),
	#[error("invalid environment entry '{0}', expected KEY=VALUE")]
	InvalidEnv(String),
}

/// Fatal errors. The supervisor has no degraded mode: any of these ends it.
#[derive(Debug, Error)]
pub enum SupervisorError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error("failed to start '{program}': {source}")]
	Spawn {
		program: String,
		#[source]
		source: io::Error,
	},
	#[error("child {stream} was not captured")]
	MissingPipe { stream: ChannelId },
	#[error("failed to subscribe to {signal}: {source}")]
	SignalRegistration {
		signal: Signal,
		#[source]
		source: io::Error,
	},
	#[error("control signal channel closed")]
	SignalChannelClosed,
	#[error("failed to collect child exit status: {source}")]
	Wait {
		#[source]
		source: io::Error,
	},
}

impl SupervisorError {
	/// Exit code the supervisor terminates with for this failure.
	pub fn exit_code(&self) -> u8 {
		match self {
			SupervisorError::Config(_) => EXIT_USAGE,
			SupervisorError::Spawn { source, .. } => match source.kind() {
				io::ErrorKind::NotFound => EXIT_NOT_FOUND,
				io::ErrorKind::PermissionDenied => EXIT_NOT_EXECUTABLE,
				_ => EXIT_SETUP_FAILURE,
			},
			_ => EXIT_SETUP_FAILURE,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn spawn_error(kind: io::ErrorKind) -> SupervisorError {
		SupervisorError::Spawn {
			program: "missing".into(),
			source: io::Error::from(kind),
		}
	}

	#[test]
	fn spawn_errors_follow_shell_codes() {
		assert_eq!(spawn_error(io::ErrorKind::NotFound).exit_code(), 127);
		assert_eq!(spawn_error(io::ErrorKind::PermissionDenied).exit_code(), 126);
		assert_eq!(spawn_error(io::ErrorKind::Other).exit_code(), EXIT_SETUP_FAILURE);
	}

	#[test]
	fn internal_failures_use_setup_code() {
		assert_eq!(SupervisorError::SignalChannelClosed.exit_code(), EXIT_SETUP_FAILURE);
		let missing = SupervisorError::MissingPipe { stream: ChannelId::Stderr };
		assert_eq!(missing.exit_code(), EXIT_SETUP_FAILURE);
		assert_eq!(missing.to_string(), "child stderr was not captured");
	}

	#[test]
	fn config_errors_are_usage_errors() {
		let err = SupervisorError::from(ConfigError::ZeroChunkSize);
		assert_eq!(err.exit_code(), EXIT_USAGE);
		assert_eq!(err.to_string(), "chunk size must be greater than zero");
	}

	#[test]
	fn messages_name_the_signal() {
		let err = ConfigError::SameSignal { signal: Signal::SIGUSR1 };
		assert_eq!(err.to_string(), "attach and detach cannot both use SIGUSR1");
	}
}
