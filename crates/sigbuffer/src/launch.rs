use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::info;

use crate::error::{ConfigError, SupervisorError};
use crate::types::ChannelId;

/// Command run when none is given.
pub const DEFAULT_COMMAND: &[&str] = &["rc", "-l"];

/// What to run under supervision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSpec {
	pub program: String,
	pub args: Vec<String>,
	pub cwd: Option<PathBuf>,
	pub env: Vec<(String, String)>,
}

impl ChildSpec {
	pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
		Self {
			program: program.into(),
			args: args.into_iter().map(Into::into).collect(),
			cwd: None,
			env: Vec::new(),
		}
	}

	/// Build from an argv-style vector; the first element is the program.
	pub fn from_argv(argv: &[String]) -> Result<Self, ConfigError> {
		match argv.split_first() {
			Some((program, args)) if !program.is_empty() => Ok(Self::new(program.clone(), args.iter().cloned())),
			_ => Err(ConfigError::EmptyCommand),
		}
	}
}

impl Default for ChildSpec {
	fn default() -> Self {
		Self::new(DEFAULT_COMMAND[0], DEFAULT_COMMAND[1..].iter().copied())
	}
}

/// A running child with its two output pipes taken out.
///
/// Only the read ends live here; the write ends were handed to the child and
/// closed on our side during spawn.
pub struct LaunchedChild {
	pub child: Child,
	pub pid: u32,
	pub stdout: ChildStdout,
	pub stderr: ChildStderr,
}

pub fn launch(spec: &ChildSpec) -> Result<LaunchedChild, SupervisorError> {
	let mut cmd = Command::new(&spec.program);
	cmd.args(&spec.args)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(false);

	if let Some(dir) = &spec.cwd {
		cmd.current_dir(dir);
	}
	for (key, val) in &spec.env {
		cmd.env(key, val);
	}

	let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
		program: spec.program.clone(),
		source,
	})?;

	let pid = child.id().unwrap_or(0);
	let stdout = child
		.stdout
		.take()
		.ok_or(SupervisorError::MissingPipe { stream: ChannelId::Stdout })?;
	let stderr = child
		.stderr
		.take()
		.ok_or(SupervisorError::MissingPipe { stream: ChannelId::Stderr })?;

	info!(pid, program = %spec.program, "child started");
	Ok(LaunchedChild {
		child,
		pid,
		stdout,
		stderr,
	})
}
