use std::io::{self, Write};

use tracing::{debug, error, info};

use crate::buffer::SpillBuffer;
use crate::types::{AttachState, ChannelId, ControlEvent, Transition};

/// One output stream of the child: where its bytes go while attached, and
/// where they wait while detached.
pub struct Channel {
	id: ChannelId,
	live: Box<dyn Write>,
	buffer: SpillBuffer,
	open: bool,
}

impl Channel {
	pub fn new(id: ChannelId, live: impl Write + 'static) -> Self {
		Self {
			id,
			live: Box::new(live),
			buffer: SpillBuffer::new(),
			open: true,
		}
	}

	pub fn id(&self) -> ChannelId {
		self.id
	}

	fn write_live(&mut self, data: &[u8]) -> io::Result<()> {
		self.live.write_all(data)?;
		self.live.flush()
	}

	fn retire(&mut self, err: &io::Error) {
		error!(channel = %self.id, "live write failed, no longer forwarding: {}", err);
		self.open = false;
		self.buffer.clear();
	}
}

/// Owns the attach state and decides, chunk by chunk, where output goes.
pub struct Router {
	state: AttachState,
	channels: Vec<Channel>,
}

impl Router {
	/// Channels are kept in [`ChannelId`] order, which is also the replay order.
	pub fn new(channels: impl IntoIterator<Item = Channel>) -> Self {
		let mut channels: Vec<Channel> = channels.into_iter().collect();
		channels.sort_by_key(Channel::id);
		Self {
			state: AttachState::default(),
			channels,
		}
	}

	/// Router wired to the supervisor's own standard streams.
	pub fn stdio() -> Self {
		Self::new([
			Channel::new(ChannelId::Stdout, io::stdout()),
			Channel::new(ChannelId::Stderr, io::stderr()),
		])
	}

	pub fn state(&self) -> AttachState {
		self.state
	}

	pub fn is_open(&self, id: ChannelId) -> bool {
		self.channel(id).is_some_and(|c| c.open)
	}

	pub fn buffered(&self, id: ChannelId) -> usize {
		self.channel(id).map_or(0, |c| c.buffer.len())
	}

	/// Deliver one chunk read from `id` to whichever sink is current right now.
	pub fn route(&mut self, id: ChannelId, data: &[u8]) {
		let attached = self.state.is_attached();
		let Some(channel) = self.channel_mut(id) else {
			return;
		};
		if !channel.open || data.is_empty() {
			return;
		}

		if attached {
			debug!(channel = %id, bytes = data.len(), "forwarding");
			if let Err(e) = channel.write_live(data) {
				channel.retire(&e);
			}
		} else {
			debug!(channel = %id, bytes = data.len(), "buffering");
			channel.buffer.append(data);
		}
	}

	pub fn apply(&mut self, event: ControlEvent) -> Transition {
		match (event, self.state) {
			(ControlEvent::Detach, AttachState::Attached) => {
				self.state = AttachState::Detached;
				info!("detached, buffering output");
				Transition::Detached
			}
			(ControlEvent::Attach, AttachState::Detached) => {
				self.state = AttachState::Attached;
				let replayed = self.replay();
				info!(replayed, "attached, replayed buffered output");
				Transition::Attached { replayed }
			}
			(event, state) => {
				debug!(?event, ?state, "redundant request ignored");
				Transition::Unchanged
			}
		}
	}

	/// The far end of `id` is gone; stop routing for it.
	///
	/// Anything already buffered stays put until the next reattach.
	pub fn close(&mut self, id: ChannelId) {
		if let Some(channel) = self.channel_mut(id) {
			if channel.open {
				debug!(channel = %id, "channel closed");
			}
			channel.open = false;
		}
	}

	/// Bytes still held across all buffers, dropped when the supervisor exits detached.
	pub fn discard_buffered(&mut self) -> usize {
		self.channels.iter_mut().map(|c| c.buffer.clear()).sum()
	}

	fn replay(&mut self) -> usize {
		let mut total = 0;
		for channel in &mut self.channels {
			match channel.buffer.drain_into(channel.live.as_mut()) {
				Ok(n) => total += n,
				Err(e) => channel.retire(&e),
			}
		}
		total
	}

	fn channel(&self, id: ChannelId) -> Option<&Channel> {
		self.channels.iter().find(|c| c.id == id)
	}

	fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
		self.channels.iter_mut().find(|c| c.id == id)
	}
}
