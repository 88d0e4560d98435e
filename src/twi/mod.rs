/// Two-wire bus (I²C style), driven in software as single master.
///
/// Both lines (CLK and DATA) are open-drain: any participant can pull a line
/// low, a released line floats high through a pull-up.
///
/// Framing:
/// - START: DATA falls while CLK is high
/// - STOP: DATA rises while CLK is high
/// - otherwise DATA only changes while CLK is low
///
/// Every byte takes 9 CLK cycles: 8 data bits (highest bit first), followed
/// by an acknowledge bit driven by the receiver (DATA low: ACK, released:
/// NACK).
///
/// A transaction:
/// - START
/// - address byte: 7-bit address in the upper bits, direction in bit 0
///   (0: send, 1: receive)
/// - data bytes; when receiving the master ACKs every byte but the last
/// - STOP
///
/// Devices may hold CLK low after a falling edge to slow the master down
/// ("clock stretching"); the master waits (bounded by `Timeout`) until CLK
/// actually is high.

mod conditions;
mod driver;
mod engine;
mod error;
mod protocol;

pub use self::conditions::ConditionGenerator;

pub use self::driver::{
	reliable_sleep,
	LineDriver,
	Paced,
	SignalFlags,
};

pub use self::engine::{
	ByteTransfer,
	Timeout,
};

pub use self::error::{
	ErrorKind,
	Status,
	TransactionError,
};

pub use self::protocol::{
	Address,
	Config,
	Direction,
	Master,
	Session,
	State,
	SCAN_FIRST,
	SCAN_LAST,
};
