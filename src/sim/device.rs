use crate::twi::Address;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Phase {
	Idle,
	Address,
	Write,
	Read,
	// not addressed, or done: wait for the next START
	Ignore,
}

/// Simulated responder (device) on the bus.
///
/// Follows the bus bit by bit: samples DATA on rising CLK edges, changes its
/// own DATA output only on falling edges. Bytes sent to it are collected,
/// reads are served from a prepared buffer (`0xff` once it runs dry).
#[derive(Clone, Debug)]
pub struct SimDevice {
	address: Address,
	data: Vec<u8>,
	read_pos: usize,
	received: Vec<u8>,
	nack_after: Option<usize>,

	phase: Phase,
	// rising edges seen in the current frame (9th is the acknowledge bit)
	bits: u8,
	shift: u8,
	// phase after the acknowledge bit of the address
	next: Phase,
	nacked: bool,
	master_acked: bool,
	out_byte: u8,
	pulls_data: bool,
}

impl SimDevice {
	pub fn new(address: Address) -> Self {
		SimDevice {
			address,
			data: Vec::new(),
			read_pos: 0,
			received: Vec::new(),
			nack_after: None,
			phase: Phase::Idle,
			bits: 0,
			shift: 0,
			next: Phase::Ignore,
			nacked: false,
			master_acked: false,
			out_byte: 0xff,
			pulls_data: false,
		}
	}

	/// bytes to return when read from
	pub fn with_data(mut self, data: &[u8]) -> Self {
		self.data = data.to_vec();
		self
	}

	/// acknowledge only the first `count` data bytes sent to us
	pub fn nack_after(mut self, count: usize) -> Self {
		self.nack_after = Some(count);
		self
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn received(&self) -> &[u8] {
		&self.received
	}

	/// number of bytes read from the device so far
	pub fn bytes_read(&self) -> usize {
		self.read_pos
	}

	pub(super) fn pulls_data_low(&self) -> bool {
		self.pulls_data
	}

	pub(super) fn on_start(&mut self) {
		self.phase = Phase::Address;
		self.bits = 0;
		self.shift = 0;
		self.pulls_data = false;
	}

	pub(super) fn on_stop(&mut self) {
		self.phase = Phase::Idle;
		self.pulls_data = false;
	}

	pub(super) fn on_rising(&mut self, data: bool) {
		match self.phase {
			Phase::Address | Phase::Write => {
				if self.bits < 8 {
					self.shift = (self.shift << 1) | (data as u8);
				}
				self.bits += 1;
			},
			Phase::Read => {
				if self.bits == 8 {
					self.master_acked = !data;
				}
				self.bits += 1;
			},
			Phase::Idle | Phase::Ignore => (),
		}
	}

	pub(super) fn on_falling(&mut self) {
		match self.phase {
			Phase::Address => match self.bits {
				8 => {
					if self.shift >> 1 == self.address.value() {
						self.pulls_data = true;
						self.next = if 0 != self.shift & 0x01 { Phase::Read } else { Phase::Write };
					} else {
						self.phase = Phase::Ignore;
					}
				},
				9 => {
					self.pulls_data = false;
					self.bits = 0;
					self.shift = 0;
					self.phase = self.next;
					if self.phase == Phase::Read {
						self.load_next();
					}
				},
				_ => (),
			},
			Phase::Write => match self.bits {
				8 => {
					let accept = self.nack_after.map_or(true, |count| self.received.len() < count);
					if accept {
						self.received.push(self.shift);
						self.pulls_data = true;
					}
					self.nacked = !accept;
				},
				9 => {
					self.pulls_data = false;
					self.bits = 0;
					self.shift = 0;
					if self.nacked {
						self.phase = Phase::Ignore;
					}
				},
				_ => (),
			},
			Phase::Read => match self.bits {
				1..=7 => self.drive_bit(),
				// let the master acknowledge
				8 => self.pulls_data = false,
				9 => {
					self.bits = 0;
					if self.master_acked {
						self.load_next();
					} else {
						self.phase = Phase::Ignore;
					}
				},
				_ => (),
			},
			Phase::Idle | Phase::Ignore => (),
		}
	}

	fn load_next(&mut self) {
		self.out_byte = self.data.get(self.read_pos).cloned().unwrap_or(0xff);
		self.read_pos += 1;
		self.drive_bit();
	}

	// bit `self.bits` (counted from the highest) goes out next
	fn drive_bit(&mut self) {
		self.pulls_data = 0 == self.out_byte & (0x80 >> self.bits);
	}
}
