use std::fmt;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Sticky condition flags reported by the line hardware.
///
/// They are cleared at the start of every bit-level operation and only
/// inspected right after it; nothing keeps them around longer.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct SignalFlags {
	/// data fell while clock was high
	pub start: bool,
	/// data rose while clock was high
	pub stop: bool,
	/// another source drove the data line against us
	pub collision: bool,
	/// the last clock cycle of a transfer has completed
	pub transfer_complete: bool,
}

impl fmt::Debug for SignalFlags {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "SignalFlags(")?;
		if self.start { write!(f, " [START]")?; }
		if self.stop { write!(f, " [STOP]")?; }
		if self.collision { write!(f, " [COLL]")?; }
		if self.transfer_complete { write!(f, " [DONE]")?; }
		write!(f, " )")
	}
}

/// Raw access to the two open-drain lines of the bus.
///
/// "Release" lets the pull-up float the line high; nothing here can force a
/// line high. Reads report the level actually observed on the wire, which
/// differs from what we drive when another device holds the line low.
pub trait LineDriver {
	fn release_clock(&mut self);
	fn pull_clock_low(&mut self);
	fn release_data(&mut self);
	fn pull_data_low(&mut self);

	fn is_clock_high(&mut self) -> bool;
	fn is_data_high(&mut self) -> bool;

	fn signal_flags(&mut self) -> SignalFlags;
	fn clear_signal_flags(&mut self);

	fn start_condition_observed(&mut self) -> bool {
		self.signal_flags().start
	}

	fn stop_condition_observed(&mut self) -> bool {
		self.signal_flags().stop
	}

	fn data_collision_observed(&mut self) -> bool {
		self.signal_flags().collision
	}

	fn transfer_complete(&mut self) -> bool {
		self.signal_flags().transfer_complete
	}

	// called between edges; the protocol itself only waits for observed levels
	fn delay(&mut self) {
	}
}

impl<'a, D: LineDriver + ?Sized> LineDriver for &'a mut D {
	fn release_clock(&mut self) { (**self).release_clock() }
	fn pull_clock_low(&mut self) { (**self).pull_clock_low() }
	fn release_data(&mut self) { (**self).release_data() }
	fn pull_data_low(&mut self) { (**self).pull_data_low() }
	fn is_clock_high(&mut self) -> bool { (**self).is_clock_high() }
	fn is_data_high(&mut self) -> bool { (**self).is_data_high() }
	fn signal_flags(&mut self) -> SignalFlags { (**self).signal_flags() }
	fn clear_signal_flags(&mut self) { (**self).clear_signal_flags() }
	fn start_condition_observed(&mut self) -> bool { (**self).start_condition_observed() }
	fn stop_condition_observed(&mut self) -> bool { (**self).stop_condition_observed() }
	fn data_collision_observed(&mut self) -> bool { (**self).data_collision_observed() }
	fn transfer_complete(&mut self) -> bool { (**self).transfer_complete() }
	fn delay(&mut self) { (**self).delay() }
}

/// Wraps a driver and waits (at least) `edge` after every edge.
///
/// Useful for hardware whose pins need settling time, or to slow a
/// simulation down to something watchable.
pub struct Paced<D> {
	inner: D,
	edge: Duration,
}

impl<D: LineDriver> Paced<D> {
	pub fn new(inner: D, edge: Duration) -> Self {
		Paced { inner, edge }
	}

	pub fn edge(&self) -> Duration {
		self.edge
	}

	pub fn get_ref(&self) -> &D {
		&self.inner
	}

	pub fn into_inner(self) -> D {
		self.inner
	}
}

impl<D: LineDriver> LineDriver for Paced<D> {
	fn release_clock(&mut self) { self.inner.release_clock() }
	fn pull_clock_low(&mut self) { self.inner.pull_clock_low() }
	fn release_data(&mut self) { self.inner.release_data() }
	fn pull_data_low(&mut self) { self.inner.pull_data_low() }
	fn is_clock_high(&mut self) -> bool { self.inner.is_clock_high() }
	fn is_data_high(&mut self) -> bool { self.inner.is_data_high() }
	fn signal_flags(&mut self) -> SignalFlags { self.inner.signal_flags() }
	fn clear_signal_flags(&mut self) { self.inner.clear_signal_flags() }
	fn start_condition_observed(&mut self) -> bool { self.inner.start_condition_observed() }
	fn stop_condition_observed(&mut self) -> bool { self.inner.stop_condition_observed() }
	fn data_collision_observed(&mut self) -> bool { self.inner.data_collision_observed() }
	fn transfer_complete(&mut self) -> bool { self.inner.transfer_complete() }

	fn delay(&mut self) {
		self.inner.delay();
		if self.edge > Duration::from_nanos(0) {
			reliable_sleep(self.edge);
		}
	}
}
