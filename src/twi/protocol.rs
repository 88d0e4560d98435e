use std::fmt;
use std::ops::{
	Deref,
	DerefMut,
};
use std::str;

use super::conditions::ConditionGenerator;
use super::engine::{
	ByteTransfer,
	Timeout,
};
use super::{
	ErrorKind,
	LineDriver,
	Status,
	TransactionError,
};

const ADDRESS_LIMIT: u8 = 0x80;

/// first address probed by `Master::scan`; below are reserved addresses
pub const SCAN_FIRST: u8 = 0x08;
/// last address probed by `Master::scan`; above are reserved addresses
pub const SCAN_LAST: u8 = 0x77;

/// Transfer direction, sent as lowest bit of the address byte.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Direction {
	Send = 0,
	Receive = 1,
}

impl Direction {
	pub fn bit(self) -> u8 {
		self as u8
	}
}

/// 7-bit device address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub(crate) u8);

impl Address {
	pub fn new(value: u8) -> Option<Self> {
		if value < ADDRESS_LIMIT {
			Some(Address(value))
		} else {
			None
		}
	}

	pub fn value(self) -> u8 {
		self.0
	}

	/// First byte of every transaction: address in the upper 7 bits,
	/// direction in bit 0.
	pub fn packed(self, direction: Direction) -> u8 {
		(self.0 << 1) | direction.bit()
	}
}

impl fmt::Debug for Address {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Address(0x{:02x})", self.0)
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl str::FromStr for Address {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let value = with_context!(("invalid device address {:?}", s), crate::parse_byte(s))?;
		ensure!(value < ADDRESS_LIMIT, "invalid device address: 0x{:02x} (only 7 bits allowed)", value);
		Ok(Address(value))
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Config {
	/// bound for every busy-wait on the lines
	pub timeout: Timeout,
}

impl Config {
	pub fn with_timeout(mut self, timeout: Timeout) -> Self {
		self.timeout = timeout;
		self
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum State {
	Idle,
	Starting,
	AddressPhase,
	DataPhase(Direction),
	Stopping,
	Closed,
}

impl State {
	pub fn is_transacting(self) -> bool {
		match self {
			State::Idle | State::Closed => false,
			_ => true,
		}
	}
}

/// Single bus master on top of a line driver.
pub struct Master<D: LineDriver> {
	driver: D,
	config: Config,
}

impl<D: LineDriver> Master<D> {
	pub fn new(driver: D, config: Config) -> Self {
		Master { driver, config }
	}

	pub fn config(&self) -> Config {
		self.config
	}

	pub fn set_config(&mut self, config: Config) {
		self.config = config;
	}

	pub fn driver(&self) -> &D {
		&self.driver
	}

	pub fn driver_mut(&mut self) -> &mut D {
		&mut self.driver
	}

	pub fn into_driver(self) -> D {
		self.driver
	}

	/// Idle session; nothing happens on the bus until `Session::begin`.
	pub fn session(&mut self, tracker: u32) -> Session<'_, D> {
		Session {
			master: self,
			state: State::Idle,
			status: Status::new(tracker),
			target: None,
			needs_stop: false,
		}
	}

	/// Open a session and begin the transaction right away.
	///
	/// The outcome of the address phase stays in the session (see
	/// `Session::check`); following byte operations are no-ops if it failed.
	pub fn begin_transaction(&mut self, address: Address, direction: Direction, tracker: u32) -> Session<'_, D> {
		let mut session = self.session(tracker);
		let _ = session.begin(address, direction);
		session
	}

	/// Complete transaction sending `bytes` to `address`.
	pub fn write(&mut self, address: Address, bytes: &[u8], tracker: u32) -> Status {
		let mut session = self.begin_transaction(address, Direction::Send, tracker);
		session.transmit(bytes);
		session.end()
	}

	/// Complete transaction filling `buffer` from `address`.
	pub fn read(&mut self, address: Address, buffer: &mut [u8], tracker: u32) -> Status {
		assert!(!buffer.is_empty(), "need at least one byte to read (the last one gets NACKed)");
		let mut session = self.begin_transaction(address, Direction::Receive, tracker);
		let _ = session.receive(buffer);
		session.end()
	}

	/// Whether a device acknowledges `address`.
	pub fn probe(&mut self, address: Address) -> bool {
		self.begin_transaction(address, Direction::Send, 0).end().is_ok()
	}

	pub fn scan(&mut self) -> Vec<Address> {
		(SCAN_FIRST..=SCAN_LAST)
			.map(Address)
			.filter(|&address| self.probe(address))
			.collect()
	}
}

/// Ownership of the bus for one transaction.
///
/// The first error sticks: once set, byte operations don't touch the bus
/// anymore and keep returning that error with the tracker from the moment
/// it failed. A begun session always sends a STOP when ended or dropped.
pub struct Session<'a, D: LineDriver + 'a> {
	master: &'a mut Master<D>,
	state: State,
	status: Status,
	target: Option<(Address, Direction)>,
	// set once we touched the bus, cleared after the STOP attempt
	needs_stop: bool,
}

impl<'a, D: LineDriver> Session<'a, D> {
	pub fn state(&self) -> State {
		self.state
	}

	pub fn status(&self) -> Status {
		self.status
	}

	pub fn tracker(&self) -> u32 {
		self.status.tracker
	}

	pub fn target(&self) -> Option<(Address, Direction)> {
		self.target
	}

	/// the sticky error, if any
	pub fn check(&self) -> Result<(), TransactionError> {
		self.status.into_result().map(|_| ())
	}

	fn timeout(&self) -> Timeout {
		self.master.config.timeout
	}

	fn fail<T>(&mut self, kind: ErrorKind) -> Result<T, TransactionError> {
		debug_assert!(!kind.is_ok());
		debug!("transaction {:?} failed at {}: {}", self.target, self.status.tracker, kind);
		self.status.error = kind;
		self.state = State::Closed;
		Err(TransactionError {
			kind,
			tracker: self.status.tracker,
		})
	}

	fn next_byte(&mut self) {
		self.status.tracker = self.status.tracker.wrapping_add(1);
	}

	fn expect_data_phase(&self, direction: Direction) {
		match self.state {
			State::DataPhase(d) if d == direction => (),
			state => panic!("can't {:?} bytes in transaction state {:?}", direction, state),
		}
	}

	// anything showing up between our transfers means someone else is on the bus
	fn check_bus_quiet(&mut self) -> Result<(), TransactionError> {
		let driver = &mut self.master.driver;
		let unexpected = if driver.start_condition_observed() {
			ErrorKind::UnexpectedStartCondition
		} else if driver.stop_condition_observed() {
			ErrorKind::UnexpectedStopCondition
		} else if driver.data_collision_observed() {
			ErrorKind::UnexpectedDataCollision
		} else {
			return Ok(());
		};
		self.fail(unexpected)
	}

	/// START, then address byte with direction bit; must be ACKed.
	pub fn begin(&mut self, address: Address, direction: Direction) -> Result<(), TransactionError> {
		assert_eq!(self.state, State::Idle, "transaction already begun");
		let timeout = self.timeout();
		self.target = Some((address, direction));
		self.needs_stop = true;

		self.state = State::Starting;
		// fails with MissingStartCondition if the START we caused wasn't seen
		if let Err(e) = self.master.driver.generate_start(timeout) {
			return self.fail(e);
		}

		self.state = State::AddressPhase;
		self.next_byte();
		let packed = address.packed(direction);
		debug!("address byte 0x{:02x} ({} {:?}) at {}", packed, address, direction, self.status.tracker);
		let acked = match self.master.driver.send_byte_bits(packed, timeout) {
			Ok(_) => self.master.driver.probe_ack(timeout),
			Err(e) => Err(e),
		};
		match acked {
			Ok(true) => {
				self.state = State::DataPhase(direction);
				Ok(())
			},
			Ok(false) => self.fail(ErrorKind::NoAckOnAddress),
			Err(e) => self.fail(e),
		}
	}

	/// Send one data byte; the device must ACK it.
	pub fn send_byte(&mut self, byte: u8) -> Result<(), TransactionError> {
		self.check()?;
		self.expect_data_phase(Direction::Send);
		let timeout = self.timeout();

		self.next_byte();
		self.check_bus_quiet()?;

		debug!("send 0x{:02x} at {}", byte, self.status.tracker);
		let acked = match self.master.driver.send_byte_bits(byte, timeout) {
			Ok(_) => self.master.driver.probe_ack(timeout),
			Err(e) => Err(e),
		};
		match acked {
			Ok(true) => Ok(()),
			Ok(false) => self.fail(ErrorKind::NoAckOnData),
			Err(e) => self.fail(e),
		}
	}

	/// Send all bytes, stopping at the first error (which sticks).
	pub fn transmit(&mut self, bytes: &[u8]) -> &mut Self {
		for &byte in bytes {
			if self.send_byte(byte).is_err() {
				break;
			}
		}
		self
	}

	/// Receive one byte; ACK it unless it is the `last` one.
	pub fn receive_byte(&mut self, last: bool) -> Result<u8, TransactionError> {
		self.check()?;
		self.expect_data_phase(Direction::Receive);
		let timeout = self.timeout();

		self.next_byte();
		self.check_bus_quiet()?;

		let byte = match self.master.driver.receive_byte_bits(timeout) {
			Ok(byte) => byte,
			Err(e) => return self.fail(e),
		};
		if let Err(e) = self.master.driver.drive_ack(!last, timeout) {
			return self.fail(e);
		}
		debug!("received 0x{:02x} at {}{}", byte, self.status.tracker, if last { " (last)" } else { "" });
		Ok(byte)
	}

	/// Fill `buffer`; the final byte gets NACKed.
	pub fn receive(&mut self, buffer: &mut [u8]) -> Result<(), TransactionError> {
		let len = buffer.len();
		for (i, place) in buffer.iter_mut().enumerate() {
			*place = self.receive_byte(i + 1 == len)?;
		}
		Ok(())
	}

	fn finish(&mut self) {
		if self.needs_stop {
			self.needs_stop = false;
			self.state = State::Stopping;
			let timeout = self.timeout();
			if let Err(e) = self.master.driver.generate_stop(timeout) {
				if self.status.error.is_ok() {
					self.status.error = e;
				} else {
					debug!("stop failed ({}), keeping earlier error {}", e, self.status.error);
				}
			}
		}
		if self.state != State::Idle {
			self.state = State::Closed;
		}
	}

	/// STOP (even after errors, to release the bus) and report the first
	/// error that happened.
	pub fn end(mut self) -> Status {
		self.finish();
		self.status
	}
}

impl<'a, D: LineDriver> Drop for Session<'a, D> {
	fn drop(&mut self) {
		if self.needs_stop {
			warn!("transaction {:?} dropped without end, releasing bus", self.target);
			self.finish();
			if !self.status.is_ok() {
				warn!("dropped transaction {:?}: {}", self.target, self.status);
			}
		}
	}
}

impl<'a, D: LineDriver> Deref for Session<'a, D> {
	type Target = D;

	fn deref(&self) -> &Self::Target {
		&self.master.driver
	}
}

impl<'a, D: LineDriver> DerefMut for Session<'a, D> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.master.driver
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::sim::{
		BusEvent,
		Fault,
		SimBus,
		SimDevice,
	};

	fn oled() -> Address {
		Address::new(0x3c).unwrap()
	}

	fn master_with(devices: Vec<SimDevice>) -> Master<SimBus> {
		let mut bus = SimBus::new();
		for device in devices {
			bus = bus.with_device(device);
		}
		Master::new(bus, Config::default())
	}

	fn error(kind: ErrorKind, tracker: u32) -> TransactionError {
		TransactionError { kind, tracker }
	}

	fn check_address(repr: &str, value: u8) {
		match repr.parse::<Address>() {
			Err(e) => panic!("{} failed to parse as Address: {}", repr, e),
			Ok(a) => assert_eq!(a.value(), value, "failed validating parsed {}", repr),
		}
	}

	fn check_invalid_address(repr: &str) {
		assert!(repr.parse::<Address>().is_err(), "{:?} must not be a valid address", repr);
	}

	#[test]
	fn parse_address() {
		check_address("0", 0);
		check_address("60", 0x3c);
		check_address("0x3c", 0x3c);
		check_address("0x7f", 0x7f);
		check_address("127", 0x7f);
		check_invalid_address("0x80");
		check_invalid_address("128");
		check_invalid_address("");
		check_invalid_address("0x");
		check_invalid_address("-1");
		assert_eq!(oled().to_string(), "0x3c");
		assert_eq!(format!("{:?}", oled()), "Address(0x3c)");
	}

	#[test]
	fn packed_address_byte() {
		for a in 0..ADDRESS_LIMIT {
			let address = Address::new(a).unwrap();
			assert_eq!(address.packed(Direction::Send), a << 1);
			assert_eq!(address.packed(Direction::Receive), (a << 1) | 1);
		}
		assert!(Address::new(ADDRESS_LIMIT).is_none());
		assert!(Address::new(0xff).is_none());
	}

	#[test]
	fn send_two_bytes() {
		let mut master = master_with(vec![SimDevice::new(oled())]);

		let mut session = master.begin_transaction(oled(), Direction::Send, 0);
		assert_eq!(session.check(), Ok(()));
		assert_eq!(session.state(), State::DataPhase(Direction::Send));
		assert_eq!(session.send_byte(0x80), Ok(()));
		assert_eq!(session.send_byte(0xae), Ok(()));
		assert_eq!(session.end(), Status { error: ErrorKind::Ok, tracker: 3 });

		let bus = master.driver();
		assert_eq!(bus.trace().events(), &[
			BusEvent::Start,
			BusEvent::Frame { byte: 0x78, ack: true },
			BusEvent::Frame { byte: 0x80, ack: true },
			BusEvent::Frame { byte: 0xae, ack: true },
			BusEvent::Stop,
		]);
		assert_eq!(bus.device(0).received(), &[0x80, 0xae]);
		assert_eq!(bus.levels(), (true, true));
	}

	#[test]
	fn no_ack_on_address() {
		let mut master = master_with(vec![]);

		let mut session = master.begin_transaction(oled(), Direction::Send, 0);
		assert_eq!(session.check(), Err(error(ErrorKind::NoAckOnAddress, 1)));
		assert_eq!(session.state(), State::Closed);
		assert_eq!(session.send_byte(0x80), Err(error(ErrorKind::NoAckOnAddress, 1)));
		session.transmit(&[0xae, 0x00]);
		assert_eq!(session.end(), Status { error: ErrorKind::NoAckOnAddress, tracker: 1 });

		let trace = master.driver().trace();
		assert_eq!(trace.frames(), vec![(0x78, false)]);
		assert_eq!(trace.events().last(), Some(&BusEvent::Stop));
	}

	#[test]
	fn no_ack_on_data_sticks() {
		let mut master = master_with(vec![SimDevice::new(oled()).nack_after(1)]);

		let mut session = master.begin_transaction(oled(), Direction::Send, 0);
		assert_eq!(session.send_byte(0x80), Ok(()));
		assert_eq!(session.send_byte(0xae), Err(error(ErrorKind::NoAckOnData, 3)));
		for _ in 0..3 {
			assert_eq!(session.send_byte(0x55), Err(error(ErrorKind::NoAckOnData, 3)));
			// direction doesn't matter anymore: nothing reaches the bus
			assert_eq!(session.receive_byte(true), Err(error(ErrorKind::NoAckOnData, 3)));
		}
		assert_eq!(session.status(), Status { error: ErrorKind::NoAckOnData, tracker: 3 });
		assert_eq!(session.end(), Status { error: ErrorKind::NoAckOnData, tracker: 3 });

		assert_eq!(master.driver().trace().frames(), vec![(0x78, true), (0x80, true), (0xae, false)]);
	}

	#[test]
	fn missing_start_condition() {
		let mut master = master_with(vec![SimDevice::new(oled())]);
		master.driver_mut().inject(Fault::MissStartCondition);

		let mut session = master.begin_transaction(oled(), Direction::Send, 5);
		assert_eq!(session.check(), Err(error(ErrorKind::MissingStartCondition, 5)));
		assert_eq!(session.send_byte(0x80), Err(error(ErrorKind::MissingStartCondition, 5)));
		assert_eq!(session.end(), Status { error: ErrorKind::MissingStartCondition, tracker: 5 });

		let bus = master.driver();
		assert!(bus.trace().frames().is_empty());
		assert!(bus.device(0).received().is_empty());
	}

	#[test]
	fn read_acks_all_but_last() {
		let data = [0x10, 0x20, 0x30, 0x40];
		for n in 1..=data.len() {
			let mut master = master_with(vec![SimDevice::new(oled()).with_data(&data)]);
			let mut buffer = vec![0u8; n];
			let status = master.read(oled(), &mut buffer, 0);
			assert_eq!(status, Status { error: ErrorKind::Ok, tracker: n as u32 + 1 });
			assert_eq!(&buffer[..], &data[..n]);

			let frames = master.driver().trace().frames();
			assert_eq!(frames[0], (0x79, true));
			let acks: Vec<bool> = frames[1..].iter().map(|&(_, ack)| ack).collect();
			let mut expected = vec![true; n - 1];
			expected.push(false);
			assert_eq!(acks, expected, "reading {} bytes", n);
		}
	}

	#[test]
	fn receive_byte_by_byte() {
		let mut master = master_with(vec![SimDevice::new(oled()).with_data(&[0xca, 0xfe])]);

		let mut session = master.begin_transaction(oled(), Direction::Receive, 0);
		assert_eq!(session.state(), State::DataPhase(Direction::Receive));
		assert_eq!(session.receive_byte(false), Ok(0xca));
		assert_eq!(session.receive_byte(true), Ok(0xfe));
		assert_eq!(session.end(), Status { error: ErrorKind::Ok, tracker: 3 });
	}

	#[test]
	fn unexpected_conditions() {
		let cases = [
			(vec![Fault::SpuriousStart], ErrorKind::UnexpectedStartCondition),
			(vec![Fault::SpuriousStop], ErrorKind::UnexpectedStopCondition),
			(vec![Fault::DataCollision], ErrorKind::UnexpectedDataCollision),
			// start wins over everything else
			(vec![Fault::DataCollision, Fault::SpuriousStop, Fault::SpuriousStart], ErrorKind::UnexpectedStartCondition),
			(vec![Fault::DataCollision, Fault::SpuriousStop], ErrorKind::UnexpectedStopCondition),
		];
		for (faults, kind) in cases.iter() {
			let mut master = master_with(vec![SimDevice::new(oled())]);
			let mut session = master.begin_transaction(oled(), Direction::Send, 0);
			assert_eq!(session.send_byte(0x80), Ok(()));
			for &fault in faults {
				session.inject(fault);
			}
			assert_eq!(session.send_byte(0xae), Err(error(*kind, 3)), "faults {:?}", faults);
			assert_eq!(session.end(), Status { error: *kind, tracker: 3 });

			let bus = master.driver();
			// 0xae never made it onto the bus
			assert_eq!(bus.trace().frames(), vec![(0x78, true), (0x80, true)]);
			assert_eq!(bus.device(0).received(), &[0x80]);
		}
	}

	#[test]
	fn faults_before_write_hit_first_data_byte() {
		let cases = [
			(Fault::SpuriousStart, ErrorKind::UnexpectedStartCondition),
			(Fault::SpuriousStop, ErrorKind::UnexpectedStopCondition),
			(Fault::DataCollision, ErrorKind::UnexpectedDataCollision),
		];
		for &(fault, kind) in cases.iter() {
			let mut master = master_with(vec![SimDevice::new(oled())]);
			// raised once the address byte got acknowledged, not by the START
			master.driver_mut().inject(fault);
			let status = master.write(oled(), &[0x80, 0xae], 0);
			assert_eq!(status, Status { error: kind, tracker: 2 }, "fault {}", fault);

			let bus = master.driver();
			assert_eq!(bus.trace().frames(), vec![(0x78, true)]);
			assert_eq!(bus.trace().events().last(), Some(&BusEvent::Stop));
			assert!(bus.device(0).received().is_empty());
		}
	}

	#[test]
	fn unexpected_conditions_while_receiving() {
		let cases = [
			(Fault::SpuriousStart, ErrorKind::UnexpectedStartCondition),
			(Fault::SpuriousStop, ErrorKind::UnexpectedStopCondition),
			(Fault::DataCollision, ErrorKind::UnexpectedDataCollision),
		];
		for &(fault, kind) in cases.iter() {
			// the device starts the second byte with a released DATA line,
			// so the STOP still gets through
			let mut master = master_with(vec![SimDevice::new(oled()).with_data(&[1, 0xff])]);
			let mut session = master.begin_transaction(oled(), Direction::Receive, 0);
			assert_eq!(session.receive_byte(false), Ok(1));
			session.inject(fault);
			assert_eq!(session.receive_byte(true), Err(error(kind, 3)), "fault {}", fault);
			assert_eq!(session.receive_byte(true), Err(error(kind, 3)));
			assert_eq!(session.end(), Status { error: kind, tracker: 3 });

			let bus = master.driver();
			assert_eq!(bus.trace().frames(), vec![(0x79, true), (1, true)]);
		}
	}

	#[test]
	fn stop_failure_reported_without_earlier_error() {
		let mut master = master_with(vec![SimDevice::new(oled())]);
		let mut session = master.begin_transaction(oled(), Direction::Send, 0);
		session.send_byte(0x80).unwrap();
		session.inject(Fault::MissStopCondition);
		assert_eq!(session.end(), Status { error: ErrorKind::MissingStopCondition, tracker: 2 });
	}

	#[test]
	fn stop_failure_masked_by_earlier_error() {
		let mut master = master_with(vec![]);
		master.driver_mut().inject(Fault::MissStopCondition);
		let status = master.write(oled(), &[0x80], 0);
		assert_eq!(status, Status { error: ErrorKind::NoAckOnAddress, tracker: 1 });
	}

	#[test]
	fn held_clock_times_out() {
		let mut master = master_with(vec![SimDevice::new(oled())]);
		master.set_config(Config::default().with_timeout(Timeout::Polls(100)));
		assert_eq!(master.config().timeout, Timeout::Polls(100));

		let mut session = master.begin_transaction(oled(), Direction::Send, 0);
		session.send_byte(0x80).unwrap();
		session.inject(Fault::HoldClock);
		assert_eq!(session.send_byte(0xae), Err(error(ErrorKind::TimedOut, 3)));
		assert_eq!(session.send_byte(0xaf), Err(error(ErrorKind::TimedOut, 3)));
		assert_eq!(session.end(), Status { error: ErrorKind::TimedOut, tracker: 3 });
		// we don't keep DATA pulled down
		assert!(master.driver_mut().is_data_high());
	}

	#[test]
	fn stalled_transfer_times_out() {
		let mut master = master_with(vec![SimDevice::new(oled())]);
		master.set_config(Config::default().with_timeout(Timeout::Polls(100)));
		master.driver_mut().inject(Fault::StallTransfer);
		let status = master.write(oled(), &[0x80], 0);
		assert_eq!(status, Status { error: ErrorKind::TimedOut, tracker: 1 });
	}

	#[test]
	fn clock_stretching_tolerated() {
		for &timeout in [Timeout::Unbounded, Timeout::Polls(64)].iter() {
			let bus = SimBus::new()
				.with_device(SimDevice::new(oled()))
				.with_clock_stretch(50);
			let mut master = Master::new(bus, Config::default().with_timeout(timeout));
			let status = master.write(oled(), &[0x80, 0xaf], 0);
			assert_eq!(status, Status { error: ErrorKind::Ok, tracker: 3 });
			assert!(master.driver().stretched_polls() > 0);
			assert_eq!(master.driver().device(0).received(), &[0x80, 0xaf]);
		}
	}

	#[test]
	fn drop_releases_bus() {
		let mut master = master_with(vec![SimDevice::new(oled())]);
		{
			let mut session = master.begin_transaction(oled(), Direction::Send, 0);
			session.send_byte(0x80).unwrap();
		}
		let bus = master.driver();
		assert_eq!(bus.trace().events().last(), Some(&BusEvent::Stop));
		assert_eq!(bus.levels(), (true, true));
	}

	#[test]
	fn idle_session_does_nothing() {
		let mut master = master_with(vec![SimDevice::new(oled())]);
		let session = master.session(7);
		assert_eq!(session.state(), State::Idle);
		assert!(!session.state().is_transacting());
		assert_eq!(session.end(), Status { error: ErrorKind::Ok, tracker: 7 });
		assert!(master.driver().trace().events().is_empty());
	}

	#[test]
	fn explicit_begin() {
		let mut master = master_with(vec![SimDevice::new(oled())]);
		let mut session = master.session(20);
		assert_eq!(session.begin(oled(), Direction::Send), Ok(()));
		assert_eq!(session.target(), Some((oled(), Direction::Send)));
		session.transmit(&[1, 2, 3]);
		assert_eq!(session.tracker(), 24);
		assert_eq!(session.end(), Status { error: ErrorKind::Ok, tracker: 24 });
	}

	#[test]
	fn write_helper() {
		let mut master = master_with(vec![SimDevice::new(oled())]);
		assert_eq!(master.write(oled(), &[0x80, 0xaf], 10), Status { error: ErrorKind::Ok, tracker: 13 });
		assert_eq!(master.write(oled(), &[], 0), Status { error: ErrorKind::Ok, tracker: 1 });
		let bus = master.into_driver();
		assert_eq!(bus.device(0).received(), &[0x80, 0xaf]);
		assert_eq!(bus.levels(), (true, true));
	}

	#[test]
	fn scan_finds_devices() {
		let mut master = master_with(vec![
			SimDevice::new(Address::new(0x50).unwrap()),
			SimDevice::new(oled()),
		]);
		assert_eq!(master.scan(), vec![oled(), Address::new(0x50).unwrap()]);
		assert!(master.probe(oled()));
		assert!(!master.probe(Address::new(0x3d).unwrap()));
	}

	#[test]
	fn works_through_mut_reference() {
		let mut bus = SimBus::new().with_device(SimDevice::new(oled()));
		{
			let mut master = Master::new(&mut bus, Config::default());
			assert!(master.write(oled(), &[0x42], 0).is_ok());
		}
		assert_eq!(bus.device(0).received(), &[0x42]);
	}

	#[test]
	#[should_panic(expected = "transaction already begun")]
	fn begin_twice_panics() {
		let mut master = master_with(vec![SimDevice::new(oled())]);
		let mut session = master.begin_transaction(oled(), Direction::Send, 0);
		let _ = session.begin(oled(), Direction::Send);
	}

	#[test]
	#[should_panic(expected = "can't Send bytes")]
	fn send_in_receive_transaction_panics() {
		let mut master = master_with(vec![SimDevice::new(oled()).with_data(&[1])]);
		let mut session = master.begin_transaction(oled(), Direction::Receive, 0);
		let _ = session.send_byte(0x80);
	}
}
