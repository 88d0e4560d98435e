use std::fmt;

/// What a logic analyzer on the bus would decode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BusEvent {
	Start,
	Stop,
	/// 8 data bits plus the acknowledge bit
	Frame {
		byte: u8,
		ack: bool,
	},
}

impl fmt::Display for BusEvent {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			BusEvent::Start => write!(f, "S"),
			BusEvent::Stop => write!(f, "P"),
			BusEvent::Frame { byte, ack } => write!(f, "{:02x}{}", byte, if ack { '+' } else { '-' }),
		}
	}
}

/// Passive monitor: decodes frames from rising CLK edges between START and
/// STOP. Partial frames (interrupted by a condition) are dropped.
#[derive(Clone, Default, Debug)]
pub struct Trace {
	events: Vec<BusEvent>,
	active: bool,
	bits: u8,
	shift: u8,
}

impl Trace {
	pub fn events(&self) -> &[BusEvent] {
		&self.events
	}

	pub fn frames(&self) -> Vec<(u8, bool)> {
		self.events.iter().filter_map(|event| match *event {
			BusEvent::Frame { byte, ack } => Some((byte, ack)),
			_ => None,
		}).collect()
	}

	/// between a START and the following STOP
	pub fn in_transaction(&self) -> bool {
		self.active
	}

	pub(super) fn on_start(&mut self) {
		self.events.push(BusEvent::Start);
		self.active = true;
		self.bits = 0;
		self.shift = 0;
	}

	pub(super) fn on_stop(&mut self) {
		self.events.push(BusEvent::Stop);
		self.active = false;
	}

	// returns true on the acknowledge bit, i.e. when a frame is complete
	pub(super) fn on_rising(&mut self, data: bool) -> bool {
		if !self.active {
			return false;
		}
		if self.bits < 8 {
			self.shift = (self.shift << 1) | (data as u8);
			self.bits += 1;
			false
		} else {
			self.events.push(BusEvent::Frame {
				byte: self.shift,
				ack: !data,
			});
			self.bits = 0;
			self.shift = 0;
			true
		}
	}
}

impl fmt::Display for Trace {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for (i, event) in self.events.iter().enumerate() {
			if i > 0 {
				write!(f, " ")?;
			}
			write!(f, "{}", event)?;
		}
		Ok(())
	}
}
