use std::str;

use super::{
	ErrorKind,
	LineDriver,
};

pub(crate) type BusResult<T> = Result<T, ErrorKind>;

/// Bound for busy-waits on the bus.
///
/// A responder may stretch the clock (hold it low) for as long as it wants;
/// `Unbounded` waits forever like plain bit-banging firmware does,
/// `Polls(n)` gives up after `n` reads of the line and reports `TimedOut`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Timeout {
	Unbounded,
	Polls(u32),
}

impl Default for Timeout {
	fn default() -> Self {
		Timeout::Polls(0xffff)
	}
}

impl str::FromStr for Timeout {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s == "unbounded" {
			return Ok(Timeout::Unbounded);
		}
		let polls = with_context!(("invalid timeout {:?} (number of polls or \"unbounded\")", s), {
			Ok(s.parse::<u32>()?)
		})?;
		Ok(Timeout::Polls(polls))
	}
}

pub(crate) fn poll_until<D, F>(driver: &mut D, timeout: Timeout, mut ready: F) -> BusResult<()>
where
	D: LineDriver + ?Sized,
	F: FnMut(&mut D) -> bool,
{
	match timeout {
		Timeout::Unbounded => {
			while !ready(driver) {
			}
			Ok(())
		},
		Timeout::Polls(polls) => {
			// always look at least once
			for _ in 0..polls.max(1) {
				if ready(driver) {
					return Ok(());
				}
			}
			Err(ErrorKind::TimedOut)
		},
	}
}

/// Shifting bits across the bus, one clock cycle per bit.
pub trait ByteTransfer: LineDriver {
	// release CLK, wait until it actually is high (a responder might stretch
	// it), sample DATA and pull CLK down again.
	fn clock_cycle(&mut self, timeout: Timeout) -> BusResult<bool> {
		self.release_clock();
		poll_until(self, timeout, |d| d.is_clock_high())?;
		self.delay(); // let the data settle for the reader
		let data = self.is_data_high();
		self.pull_clock_low();
		self.delay();
		Ok(data)
	}

	/// Transfer the `bit_count` highest bits of `value`, starting with bit 7.
	///
	/// A `1` bit releases DATA, so sending `0xff` is the same as receiving.
	/// Returns the levels sampled while CLK was high, shifted in from the
	/// right: a single bit ends up in bit 0.
	///
	/// DATA is released when done; CLK stays low.
	fn transfer_bits(&mut self, value: u8, bit_count: u8, timeout: Timeout) -> BusResult<u8> {
		assert!(bit_count >= 1 && bit_count <= 8);
		self.clear_signal_flags();

		let mut observed = 0u8;
		for bit in 0..bit_count {
			self.pull_clock_low();
			if 0 != value & (0x80 >> bit) {
				self.release_data();
			} else {
				self.pull_data_low();
			}
			self.delay(); // DATA stable before CLK goes up

			let high = self.clock_cycle(timeout)?;
			observed = (observed << 1) | (high as u8);
		}

		let result = poll_until(self, timeout, |d| d.transfer_complete());
		self.release_data();
		result?;

		trace!("transferred {} bit(s): sent 0x{:02x}, observed 0x{:02x}", bit_count, value, observed);
		Ok(observed)
	}

	fn send_byte_bits(&mut self, byte: u8, timeout: Timeout) -> BusResult<u8> {
		self.transfer_bits(byte, 8, timeout)
	}

	fn receive_byte_bits(&mut self, timeout: Timeout) -> BusResult<u8> {
		self.transfer_bits(0xff, 8, timeout)
	}

	/// Release DATA for one cycle; `true` if the other side pulled it low.
	fn probe_ack(&mut self, timeout: Timeout) -> BusResult<bool> {
		let nack_bit = self.transfer_bits(0xff, 1, timeout)?;
		Ok(0 == nack_bit & 0x01)
	}

	/// Drive the ACK bit ourselves: low to ask for more, released to stop.
	fn drive_ack(&mut self, ack: bool, timeout: Timeout) -> BusResult<()> {
		self.transfer_bits(if ack { 0x00 } else { 0xff }, 1, timeout)?;
		Ok(())
	}
}

impl<D: LineDriver + ?Sized> ByteTransfer for D {
}
