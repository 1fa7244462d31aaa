use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use nix::sys::signal::Signal;

use crate::error::ConfigError;
use crate::launch::ChildSpec;
use crate::signals::{parse_signal, validate_pair};
use crate::supervisor::{SupervisorOptions, DEFAULT_CHUNK_SIZE};
use crate::telemetry::LogSettings;

/// Command line and environment settings.
#[derive(Debug, Parser)]
#[command(
	name = "sigbuffer",
	version,
	about = "Run a command, mirroring its output while attached and holding it in memory while detached",
	after_help = "Send the attach signal (default SIGUSR1) to replay held output and resume mirroring.\n\
	              Send the detach signal (default SIGUSR2) to start holding output."
)]
pub struct Cli {
	/// Signal that reattaches and replays held output
	#[arg(long, env = "SIGBUFFER_ATTACH_SIGNAL", default_value = "USR1", value_parser = parse_signal)]
	pub attach_signal: Signal,

	/// Signal that detaches and starts holding output
	#[arg(long, env = "SIGBUFFER_DETACH_SIGNAL", default_value = "USR2", value_parser = parse_signal)]
	pub detach_signal: Signal,

	/// Maximum bytes read from a pipe per wake
	#[arg(long, env = "SIGBUFFER_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
	pub chunk_size: usize,

	/// How long to keep reading the pipes after the child exits
	#[arg(long, env = "SIGBUFFER_DRAIN_GRACE_MS", default_value_t = 100)]
	pub drain_grace_ms: u64,

	/// Working directory for the command
	#[arg(long, value_name = "DIR")]
	pub cwd: Option<PathBuf>,

	/// Extra environment for the command (repeatable)
	#[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
	pub env: Vec<(String, String)>,

	/// Log filter directive, e.g. `info` or `sigbuffer=debug`
	#[arg(long = "log", env = "SIGBUFFER_LOG", default_value = "warn")]
	pub log_filter: String,

	/// Write diagnostics to this file instead of stderr
	#[arg(long, env = "SIGBUFFER_LOG_FILE", value_name = "PATH")]
	pub log_file: Option<PathBuf>,

	/// Command to run, defaults to `rc -l`
	#[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
	pub command: Vec<String>,
}

/// Validated settings ready to hand to the supervisor.
#[derive(Debug, Clone)]
pub struct Settings {
	pub child: ChildSpec,
	pub options: SupervisorOptions,
	pub log: LogSettings,
}

impl Cli {
	pub fn into_settings(self) -> Result<Settings, ConfigError> {
		validate_pair(self.attach_signal, self.detach_signal)?;
		if self.chunk_size == 0 {
			return Err(ConfigError::ZeroChunkSize);
		}

		let mut child = if self.command.is_empty() {
			ChildSpec::default()
		} else {
			ChildSpec::from_argv(&self.command)?
		};
		child.cwd = self.cwd;
		child.env = self.env;

		Ok(Settings {
			child,
			options: SupervisorOptions {
				attach_signal: self.attach_signal,
				detach_signal: self.detach_signal,
				chunk_size: self.chunk_size,
				drain_grace: Duration::from_millis(self.drain_grace_ms),
			},
			log: LogSettings {
				filter: self.log_filter,
				file: self.log_file,
			},
		})
	}
}

fn parse_env_pair(raw: &str) -> Result<(String, String), ConfigError> {
	match raw.split_once('=') {
		Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
		_ => Err(ConfigError::InvalidEnv(raw.to_string())),
	}
}
