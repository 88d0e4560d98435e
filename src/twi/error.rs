use failure::Fail;
use std::fmt;

/// Outcome of a transaction; exactly one of these describes any transaction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ErrorKind {
	Ok,
	/// the addressed device did not acknowledge the address byte
	NoAckOnAddress,
	/// the device did not acknowledge a data byte
	NoAckOnData,
	/// generated start condition not detected on the bus
	MissingStartCondition,
	/// generated stop condition not detected on the bus
	MissingStopCondition,
	/// a start condition showed up that we didn't generate
	UnexpectedStartCondition,
	/// a stop condition showed up that we didn't generate
	UnexpectedStopCondition,
	/// someone else drove the data line (arbitration lost, or a glitch)
	UnexpectedDataCollision,
	/// a line or the transfer didn't reach the expected state in time
	TimedOut,
}

impl ErrorKind {
	pub fn is_ok(self) -> bool {
		self == ErrorKind::Ok
	}

	/// Numeric error level, compatible with the levels flashed by the
	/// attiny firmware: the most likely errors get the lowest numbers.
	pub fn level(self) -> u8 {
		match self {
			ErrorKind::Ok => 0,
			ErrorKind::NoAckOnAddress => 1,
			ErrorKind::NoAckOnData => 2,
			ErrorKind::MissingStartCondition => 3,
			ErrorKind::MissingStopCondition => 4,
			ErrorKind::UnexpectedDataCollision => 5,
			ErrorKind::UnexpectedStopCondition => 6,
			ErrorKind::UnexpectedStartCondition => 7,
			ErrorKind::TimedOut => 8,
		}
	}

	pub fn description(self) -> &'static str {
		match self {
			ErrorKind::Ok => "ok",
			ErrorKind::NoAckOnAddress => "no ACK on address",
			ErrorKind::NoAckOnData => "no ACK on data",
			ErrorKind::MissingStartCondition => "generated start condition not detected",
			ErrorKind::MissingStopCondition => "generated stop condition not detected",
			ErrorKind::UnexpectedStartCondition => "unexpected start condition",
			ErrorKind::UnexpectedStopCondition => "unexpected stop condition",
			ErrorKind::UnexpectedDataCollision => "unexpected data collision",
			ErrorKind::TimedOut => "timed out waiting for the bus",
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.description())
	}
}

/// Final diagnostic pair of a transaction.
///
/// `tracker` tells which byte position the error belongs to: it counts every
/// byte attempted, starting at the value the session was opened with.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Status {
	pub error: ErrorKind,
	pub tracker: u32,
}

impl Status {
	pub fn new(tracker: u32) -> Self {
		Status {
			error: ErrorKind::Ok,
			tracker,
		}
	}

	pub fn is_ok(&self) -> bool {
		self.error.is_ok()
	}

	/// returns the tracker on success
	pub fn into_result(self) -> Result<u32, TransactionError> {
		if self.error.is_ok() {
			Ok(self.tracker)
		} else {
			Err(TransactionError {
				kind: self.error,
				tracker: self.tracker,
			})
		}
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{} (level {}) at {}", self.error, self.error.level(), self.tracker)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Fail)]
#[fail(display = "{} at {}", kind, tracker)]
pub struct TransactionError {
	pub kind: ErrorKind,
	pub tracker: u32,
}

impl TransactionError {
	pub fn status(&self) -> Status {
		Status {
			error: self.kind,
			tracker: self.tracker,
		}
	}
}
