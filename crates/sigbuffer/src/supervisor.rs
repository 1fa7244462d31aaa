use std::io;
use std::time::Duration;

use nix::sys::signal::Signal;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, info, warn};

use crate::error::SupervisorError;
use crate::launch::{self, ChildSpec, LaunchedChild};
use crate::router::Router;
use crate::signals::{self, ControlSource, SignalControl};
use crate::types::{ChannelId, ExitOutcome};

/// Read size for each wake on a data channel.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
/// How long to keep draining pipes once the child is gone.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
	pub attach_signal: Signal,
	pub detach_signal: Signal,
	pub chunk_size: usize,
	pub drain_grace: Duration,
}

impl Default for SupervisorOptions {
	fn default() -> Self {
		Self {
			attach_signal: Signal::SIGUSR1,
			detach_signal: Signal::SIGUSR2,
			chunk_size: DEFAULT_CHUNK_SIZE,
			drain_grace: DEFAULT_DRAIN_GRACE,
		}
	}
}

/// The single event loop: one child, two output channels, one control source.
pub struct Supervisor<C> {
	child: LaunchedChild,
	control: C,
	router: Router,
	chunk_size: usize,
	drain_grace: Duration,
}

/// Subscribe to the control signals, start the child, and mirror it to our
/// own stdout/stderr until it exits.
///
/// The signal pair is checked here as well as in `Cli::into_settings`, since
/// library callers build `SupervisorOptions` directly. Nothing is registered
/// or spawned when the pair is rejected.
pub async fn supervise(spec: &ChildSpec, options: &SupervisorOptions) -> Result<ExitOutcome, SupervisorError> {
	signals::validate_pair(options.attach_signal, options.detach_signal)?;
	let control = SignalControl::register(options.attach_signal, options.detach_signal)?;
	let child = launch::launch(spec)?;
	Supervisor::new(child, control, Router::stdio(), options).run().await
}

impl<C: ControlSource> Supervisor<C> {
	pub fn new(child: LaunchedChild, control: C, router: Router, options: &SupervisorOptions) -> Self {
		Self {
			child,
			control,
			router,
			chunk_size: options.chunk_size.max(1),
			drain_grace: options.drain_grace,
		}
	}

	/// Run until the child exits and return how it ended.
	pub async fn run(self) -> Result<ExitOutcome, SupervisorError> {
		let Supervisor {
			child: LaunchedChild {
				mut child,
				pid,
				mut stdout,
				mut stderr,
			},
			mut control,
			mut router,
			chunk_size,
			drain_grace,
		} = self;

		let mut out_buf = vec![0u8; chunk_size];
		let mut err_buf = vec![0u8; chunk_size];

		loop {
			tokio::select! {
				biased;
				event = control.recv() => {
					let event = event.ok_or(SupervisorError::SignalChannelClosed)?;
					let transition = router.apply(event);
					debug!(?event, ?transition, "control event");
				}
				status = child.wait() => {
					let status = status.map_err(|source| SupervisorError::Wait { source })?;
					let outcome = ExitOutcome::from(status);
					info!(pid, %outcome, "child exited");

					drain(&mut router, &mut stdout, &mut stderr, &mut out_buf, &mut err_buf, drain_grace).await;
					let discarded = router.discard_buffered();
					if discarded > 0 {
						warn!(bytes = discarded, "exiting while detached, buffered output discarded");
					}
					return Ok(outcome);
				}
				read = stdout.read(&mut out_buf), if router.is_open(ChannelId::Stdout) => {
					on_read(&mut router, ChannelId::Stdout, read, &out_buf);
				}
				read = stderr.read(&mut err_buf), if router.is_open(ChannelId::Stderr) => {
					on_read(&mut router, ChannelId::Stderr, read, &err_buf);
				}
			}
		}
	}
}

fn on_read(router: &mut Router, id: ChannelId, read: io::Result<usize>, buf: &[u8]) {
	match read {
		Ok(0) => router.close(id),
		Ok(n) => router.route(id, &buf[..n]),
		Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
		Err(e) => {
			error!(channel = %id, "read failed: {}", e);
			router.close(id);
		}
	}
}

/// Pick up whatever the child wrote just before exiting. Bounded by `grace`
/// since a grandchild may still hold a pipe open.
async fn drain<O, E>(
	router: &mut Router,
	stdout: &mut O,
	stderr: &mut E,
	out_buf: &mut [u8],
	err_buf: &mut [u8],
	grace: Duration,
) where
	O: AsyncRead + Unpin,
	E: AsyncRead + Unpin,
{
	let remaining = async {
		loop {
			tokio::select! {
				read = stdout.read(out_buf), if router.is_open(ChannelId::Stdout) => {
					on_read(router, ChannelId::Stdout, read, out_buf);
				}
				read = stderr.read(err_buf), if router.is_open(ChannelId::Stderr) => {
					on_read(router, ChannelId::Stderr, read, err_buf);
				}
				else => break,
			}
		}
	};

	if tokio::time::timeout(grace, remaining).await.is_err() {
		debug!("output pipes still open after child exit, not waiting further");
	}
}
