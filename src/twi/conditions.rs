use super::engine::{
	poll_until,
	BusResult,
	Timeout,
};
use super::{
	ErrorKind,
	LineDriver,
};

/// Start and stop framing, built from the same line primitives as the bit
/// transfers.
pub trait ConditionGenerator: LineDriver {
	/// START: DATA falls while CLK is high.
	///
	/// Leaves CLK low and DATA released, ready for the first bit.
	fn generate_start(&mut self, timeout: Timeout) -> BusResult<()> {
		self.clear_signal_flags();

		// releasing DATA first: with CLK high a rising DATA would be a STOP
		self.release_data();
		self.release_clock();
		poll_until(self, timeout, |d| d.is_clock_high())?;
		self.delay();

		self.pull_data_low();
		self.delay();
		self.pull_clock_low();
		self.release_data();
		self.delay();

		if !self.start_condition_observed() {
			return Err(ErrorKind::MissingStartCondition);
		}
		trace!("start condition");
		Ok(())
	}

	/// STOP: DATA rises while CLK is high.
	///
	/// Returns once DATA was seen high again, i.e. the bus is free.
	fn generate_stop(&mut self, timeout: Timeout) -> BusResult<()> {
		self.clear_signal_flags();

		self.pull_data_low();
		self.release_clock();
		let clock = poll_until(self, timeout, |d| d.is_clock_high());
		self.delay();
		// never keep holding DATA, even if CLK is stuck
		self.release_data();
		clock?;

		poll_until(self, timeout, |d| d.is_data_high())?;
		self.delay();

		if !self.stop_condition_observed() {
			return Err(ErrorKind::MissingStopCondition);
		}
		trace!("stop condition");
		Ok(())
	}
}

impl<D: LineDriver + ?Sized> ConditionGenerator for D {
}
