//! Mode-switch notifications.
//!
//! Signals never run supervisor code directly. Registering a signal replaces
//! its default disposition, and the handler only marks the stream ready; the
//! event loop picks the event up on its next wake.

use std::future::Future;
use std::str::FromStr;

use nix::sys::signal::Signal;
use tokio::signal::unix::{signal, Signal as SignalStream, SignalKind};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{ConfigError, SupervisorError};
use crate::types::ControlEvent;

/// Source of [`ControlEvent`]s for the event loop.
///
/// `None` means the source itself is broken and no further events can arrive.
pub trait ControlSource {
	fn recv(&mut self) -> impl Future<Output = Option<ControlEvent>>;
}

/// Control events driven by two Unix signals.
pub struct SignalControl {
	attach: SignalStream,
	detach: SignalStream,
}

impl SignalControl {
	/// Subscribe to both signals. Must happen before the child is spawned so
	/// neither signal can take its default (fatal) action afterwards.
	pub fn register(attach: Signal, detach: Signal) -> Result<Self, SupervisorError> {
		Ok(Self {
			attach: subscribe(attach)?,
			detach: subscribe(detach)?,
		})
	}
}

fn subscribe(sig: Signal) -> Result<SignalStream, SupervisorError> {
	let stream = signal(SignalKind::from_raw(sig as i32))
		.map_err(|source| SupervisorError::SignalRegistration { signal: sig, source })?;
	debug!(signal = %sig, "subscribed");
	Ok(stream)
}

impl ControlSource for SignalControl {
	async fn recv(&mut self) -> Option<ControlEvent> {
		tokio::select! {
			biased;
			got = self.attach.recv() => got.map(|()| ControlEvent::Attach),
			got = self.detach.recv() => got.map(|()| ControlEvent::Detach),
		}
	}
}

impl ControlSource for mpsc::UnboundedReceiver<ControlEvent> {
	async fn recv(&mut self) -> Option<ControlEvent> {
		mpsc::UnboundedReceiver::recv(self).await
	}
}

/// Parse `USR1`, `SIGUSR1`, `usr1` or a signal number.
pub fn parse_signal(raw: &str) -> Result<Signal, ConfigError> {
	let trimmed = raw.trim();
	if let Ok(num) = trimmed.parse::<i32>() {
		return Signal::try_from(num).map_err(|_| ConfigError::UnknownSignal(raw.to_string()));
	}

	let upper = trimmed.to_ascii_uppercase();
	let name = if upper.starts_with("SIG") {
		upper
	} else {
		format!("SIG{}", upper)
	};
	Signal::from_str(&name).map_err(|_| ConfigError::UnknownSignal(raw.to_string()))
}

/// Reject mappings that would make the supervisor unusable.
pub fn validate_pair(attach: Signal, detach: Signal) -> Result<(), ConfigError> {
	for signal in [attach, detach] {
		if matches!(signal, Signal::SIGCHLD | Signal::SIGKILL | Signal::SIGSTOP) {
			return Err(ConfigError::ReservedSignal { signal });
		}
	}
	if attach == detach {
		return Err(ConfigError::SameSignal { signal: attach });
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_names_with_and_without_prefix() {
		assert_eq!(parse_signal("USR1"), Ok(Signal::SIGUSR1));
		assert_eq!(parse_signal("SIGUSR2"), Ok(Signal::SIGUSR2));
		assert_eq!(parse_signal(" winch "), Ok(Signal::SIGWINCH));
	}

	#[test]
	fn parses_numbers() {
		assert_eq!(parse_signal("1"), Ok(Signal::SIGHUP));
		assert_eq!(parse_signal(&(Signal::SIGUSR1 as i32).to_string()), Ok(Signal::SIGUSR1));
	}

	#[test]
	fn rejects_unknown_signals() {
		assert_eq!(parse_signal("NOPE"), Err(ConfigError::UnknownSignal("NOPE".into())));
		assert_eq!(parse_signal("0"), Err(ConfigError::UnknownSignal("0".into())));
	}

	#[test]
	fn pair_must_be_distinct() {
		assert!(validate_pair(Signal::SIGUSR1, Signal::SIGUSR2).is_ok());
		assert_eq!(
			validate_pair(Signal::SIGUSR1, Signal::SIGUSR1),
			Err(ConfigError::SameSignal { signal: Signal::SIGUSR1 })
		);
	}

	#[test]
	fn pair_cannot_use_reserved_signals() {
		assert_eq!(
			validate_pair(Signal::SIGCHLD, Signal::SIGUSR2),
			Err(ConfigError::ReservedSignal { signal: Signal::SIGCHLD })
		);
		assert_eq!(
			validate_pair(Signal::SIGUSR1, Signal::SIGKILL),
			Err(ConfigError::ReservedSignal { signal: Signal::SIGKILL })
		);
	}

	#[tokio::test]
	async fn channel_receiver_is_a_control_source() {
		let (tx, mut rx) = mpsc::unbounded_channel();
		tx.send(ControlEvent::Detach).unwrap();
		tx.send(ControlEvent::Attach).unwrap();
		drop(tx);

		assert_eq!(ControlSource::recv(&mut rx).await, Some(ControlEvent::Detach));
		assert_eq!(ControlSource::recv(&mut rx).await, Some(ControlEvent::Attach));
		assert_eq!(ControlSource::recv(&mut rx).await, None);
	}
}
