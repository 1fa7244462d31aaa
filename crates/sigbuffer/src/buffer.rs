use std::io::{self, Write};

/// In-memory holding area for one channel's output while detached.
///
/// Holds exactly the bytes appended since the last drain, in append order.
/// Only the event loop touches it, so there is no locking.
#[derive(Debug, Default)]
pub struct SpillBuffer {
	bytes: Vec<u8>,
}

impl SpillBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn append(&mut self, data: &[u8]) {
		self.bytes.extend_from_slice(data);
	}

	/// Write every held byte to `sink`, then reset to empty.
	///
	/// The buffer is emptied even when the write fails: the caller retires the
	/// channel on error, and a later drain must never repeat bytes that may
	/// already have reached the sink.
	pub fn drain_into<W: Write + ?Sized>(&mut self, sink: &mut W) -> io::Result<usize> {
		if self.bytes.is_empty() {
			return Ok(0);
		}
		let held = std::mem::take(&mut self.bytes);
		sink.write_all(&held)?;
		sink.flush()?;
		Ok(held.len())
	}

	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	pub fn clear(&mut self) -> usize {
		let dropped = self.bytes.len();
		self.bytes.clear();
		dropped
	}
}
