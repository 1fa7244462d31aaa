use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

/// One of the child's output streams.
///
/// The derived ordering is the replay order on reattach: stdout first, then stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelId {
	Stdout,
	Stderr,
}

impl ChannelId {
	pub const ALL: [ChannelId; 2] = [ChannelId::Stdout, ChannelId::Stderr];

	pub fn name(self) -> &'static str {
		match self {
			ChannelId::Stdout => "stdout",
			ChannelId::Stderr => "stderr",
		}
	}
}

impl fmt::Display for ChannelId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachState {
	#[default]
	Attached,
	Detached,
}

impl AttachState {
	pub fn is_attached(self) -> bool {
		matches!(self, AttachState::Attached)
	}
}

/// A mode-switch request delivered to the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
	Attach,
	Detach,
}

/// What applying a [`ControlEvent`] actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
	/// Switched to attached; `replayed` bytes were flushed from the buffers.
	Attached { replayed: usize },
	Detached,
	/// The request matched the current state.
	Unchanged,
}

/// How the supervised child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
	Exited(u8),
	Signaled(i32),
}

impl ExitOutcome {
	/// Exit code for the supervisor itself. Signal deaths follow the shell
	/// convention of `128 + signo`.
	pub fn code(self) -> u8 {
		match self {
			ExitOutcome::Exited(code) => code,
			ExitOutcome::Signaled(signo) => u8::try_from(128 + signo).unwrap_or(u8::MAX),
		}
	}
}

impl From<ExitStatus> for ExitOutcome {
	fn from(status: ExitStatus) -> Self {
		if let Some(code) = status.code() {
			// wait(2) only reports the low eight bits.
			ExitOutcome::Exited((code & 0xff) as u8)
		} else if let Some(signo) = status.signal() {
			ExitOutcome::Signaled(signo)
		} else {
			ExitOutcome::Exited(1)
		}
	}
}

impl fmt::Display for ExitOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExitOutcome::Exited(code) => write!(f, "exit {}", code),
			ExitOutcome::Signaled(signo) => write!(f, "signal {}", signo),
		}
	}
}
