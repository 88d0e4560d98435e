/// Simulated bus: open-drain lines with pull-ups, responders and a monitor.
///
/// Every line change settles immediately: conditions and clock edges are
/// detected and passed on to the devices (which may react by changing their
/// own DATA output) until nothing changes anymore.
///
/// There is no second master; collisions and unexpected conditions can only
/// be provoked through `Fault`.

mod device;
mod trace;

use std::fmt;
use std::str;

pub use self::device::SimDevice;
pub use self::trace::{
	BusEvent,
	Trace,
};

use crate::twi::{
	LineDriver,
	SignalFlags,
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Fault {
	/// start detector stays silent (persistent)
	MissStartCondition,
	/// stop detector stays silent (persistent)
	MissStopCondition,
	/// something holds CLK low (persistent)
	HoldClock,
	/// transfer completion never signalled (persistent)
	StallTransfer,
	/// report a start condition once (one-shot, see `SimBus::inject`)
	SpuriousStart,
	/// report a stop condition once (one-shot)
	SpuriousStop,
	/// report a data collision once (one-shot)
	DataCollision,
}

impl Fault {
	pub const ALL: [Fault; 7] = [
		Fault::MissStartCondition,
		Fault::MissStopCondition,
		Fault::HoldClock,
		Fault::StallTransfer,
		Fault::SpuriousStart,
		Fault::SpuriousStop,
		Fault::DataCollision,
	];

	pub fn name(self) -> &'static str {
		match self {
			Fault::MissStartCondition => "miss-start",
			Fault::MissStopCondition => "miss-stop",
			Fault::HoldClock => "hold-clock",
			Fault::StallTransfer => "stall-transfer",
			Fault::SpuriousStart => "spurious-start",
			Fault::SpuriousStop => "spurious-stop",
			Fault::DataCollision => "collision",
		}
	}
}

impl fmt::Display for Fault {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl str::FromStr for Fault {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		for &fault in Fault::ALL.iter() {
			if fault.name() == s {
				return Ok(fault);
			}
		}
		let names: Vec<&str> = Fault::ALL.iter().map(|f| f.name()).collect();
		bail!("unknown fault {:?} (known: {})", s, names.join(", "));
	}
}

#[derive(Clone, Copy, Default, Debug)]
struct Faults {
	miss_start: bool,
	miss_stop: bool,
	hold_clock: bool,
	stall_transfer: bool,
}

pub struct SimBus {
	devices: Vec<SimDevice>,
	trace: Trace,
	flags: SignalFlags,
	faults: Faults,
	// one-shot faults waiting for the end of the next acknowledge cycle
	armed: SignalFlags,
	ack_cycle: bool,

	// what the master drives (true: released)
	master_clock: bool,
	master_data: bool,
	// resolved line levels
	clock: bool,
	data: bool,

	clock_stretch: u32,
	stretch_left: u32,
	stretched_polls: u64,
}

impl SimBus {
	pub fn new() -> Self {
		SimBus {
			devices: Vec::new(),
			trace: Trace::default(),
			flags: SignalFlags::default(),
			faults: Faults::default(),
			armed: SignalFlags::default(),
			ack_cycle: false,
			master_clock: true,
			master_data: true,
			clock: true,
			data: true,
			clock_stretch: 0,
			stretch_left: 0,
			stretched_polls: 0,
		}
	}

	pub fn with_device(mut self, device: SimDevice) -> Self {
		self.devices.push(device);
		self
	}

	/// devices hold CLK low for `polls` reads of the line after every
	/// falling edge
	pub fn with_clock_stretch(mut self, polls: u32) -> Self {
		self.clock_stretch = polls;
		self
	}

	pub fn devices(&self) -> &[SimDevice] {
		&self.devices
	}

	pub fn device(&self, index: usize) -> &SimDevice {
		&self.devices[index]
	}

	pub fn trace(&self) -> &Trace {
		&self.trace
	}

	/// (CLK, DATA) as seen on the wire
	pub fn levels(&self) -> (bool, bool) {
		(self.clock, self.data)
	}

	/// how often the master found CLK held low by stretching
	pub fn stretched_polls(&self) -> u64 {
		self.stretched_polls
	}

	/// Persistent faults take effect right away. One-shot faults raise their
	/// flag right away inside a transaction (after a START); on an idle bus
	/// they are armed and raised when the next acknowledge cycle ends, so
	/// the check before the following data byte sees them.
	pub fn inject(&mut self, fault: Fault) {
		debug!("injecting fault {}", fault);
		let mut raise = SignalFlags::default();
		match fault {
			Fault::MissStartCondition => self.faults.miss_start = true,
			Fault::MissStopCondition => self.faults.miss_stop = true,
			Fault::HoldClock => {
				self.faults.hold_clock = true;
				self.settle();
			},
			Fault::StallTransfer => self.faults.stall_transfer = true,
			Fault::SpuriousStart => raise.start = true,
			Fault::SpuriousStop => raise.stop = true,
			Fault::DataCollision => raise.collision = true,
		}
		if self.trace.in_transaction() {
			merge_conditions(&mut self.flags, raise);
		} else {
			merge_conditions(&mut self.armed, raise);
		}
	}

	pub fn clear_faults(&mut self) {
		self.faults = Faults::default();
		self.armed = SignalFlags::default();
		self.settle();
	}

	fn resolve(&self) -> (bool, bool) {
		let clock = self.master_clock && 0 == self.stretch_left && !self.faults.hold_clock;
		let data = self.master_data && !self.devices.iter().any(|d| d.pulls_data_low());
		(clock, data)
	}

	fn settle(&mut self) {
		loop {
			let (clock, data) = self.resolve();
			if clock != self.clock {
				self.clock = clock;
				if clock {
					self.rising_edge();
				} else {
					self.falling_edge();
				}
			} else if data != self.data {
				self.data = data;
				if clock {
					if data {
						self.stop_condition();
					} else {
						self.start_condition();
					}
				}
			} else {
				return;
			}
		}
	}

	fn rising_edge(&mut self) {
		let data = self.data;
		for device in &mut self.devices {
			device.on_rising(data);
		}
		self.ack_cycle = self.trace.on_rising(data);
	}

	fn falling_edge(&mut self) {
		if !self.faults.stall_transfer {
			self.flags.transfer_complete = true;
		}
		self.stretch_left = self.clock_stretch;
		for device in &mut self.devices {
			device.on_falling();
		}
		if self.ack_cycle {
			self.ack_cycle = false;
			let armed = self.armed;
			self.armed = SignalFlags::default();
			if armed != SignalFlags::default() {
				trace!("bus: raising armed {:?}", armed);
			}
			merge_conditions(&mut self.flags, armed);
		}
	}

	fn start_condition(&mut self) {
		trace!("bus: START");
		if !self.faults.miss_start {
			self.flags.start = true;
		}
		for device in &mut self.devices {
			device.on_start();
		}
		self.trace.on_start();
	}

	fn stop_condition(&mut self) {
		trace!("bus: STOP");
		if !self.faults.miss_stop {
			self.flags.stop = true;
		}
		for device in &mut self.devices {
			device.on_stop();
		}
		self.trace.on_stop();
	}
}

fn merge_conditions(flags: &mut SignalFlags, other: SignalFlags) {
	flags.start |= other.start;
	flags.stop |= other.stop;
	flags.collision |= other.collision;
}

impl Default for SimBus {
	fn default() -> Self {
		SimBus::new()
	}
}

impl LineDriver for SimBus {
	fn release_clock(&mut self) {
		self.master_clock = true;
		self.settle();
	}

	fn pull_clock_low(&mut self) {
		self.master_clock = false;
		self.settle();
	}

	fn release_data(&mut self) {
		self.master_data = true;
		self.settle();
	}

	fn pull_data_low(&mut self) {
		self.master_data = false;
		self.settle();
	}

	fn is_clock_high(&mut self) -> bool {
		if self.stretch_left > 0 && self.master_clock {
			self.stretched_polls += 1;
			self.stretch_left -= 1;
			if 0 == self.stretch_left {
				self.settle();
			}
		}
		self.clock
	}

	fn is_data_high(&mut self) -> bool {
		self.data
	}

	fn signal_flags(&mut self) -> SignalFlags {
		self.flags
	}

	fn clear_signal_flags(&mut self) {
		self.flags = SignalFlags::default();
	}
}
