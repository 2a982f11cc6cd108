use std::fmt;
use std::thread;
use std::time::{
	Duration,
	Instant,
};

use crate::eeprom::DeviceAddress;

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

/// Status of a single bus transaction: 0 is success, negative values are
/// (negated) errno codes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct BusStatus(pub i32);

impl BusStatus {
	pub const OK: BusStatus = BusStatus(0);
	/// device didn't acknowledge its address (absent or busy)
	pub const NACK: BusStatus = BusStatus(-libc::ENXIO);
	/// message too long for the bus buffer or otherwise malformed
	pub const INVALID: BusStatus = BusStatus(-libc::EINVAL);

	pub fn from_errno(errno: i32) -> Self {
		if 0 == errno {
			// never report success for a failed call
			BusStatus(-libc::EIO)
		} else {
			BusStatus(-errno.abs())
		}
	}

	pub fn is_ok(&self) -> bool {
		0 == self.0
	}

	pub fn is_err(&self) -> bool {
		!self.is_ok()
	}
}

impl fmt::Display for BusStatus {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		if self.is_ok() {
			write!(f, "ok")
		} else {
			let os = std::io::Error::from_raw_os_error(-self.0);
			write!(f, "{} ({})", self.0, os)
		}
	}
}

pub trait BusTransport {
	/// Transmit `bytes` to `device` as one write transaction.
	///
	/// With `keep_bus_active` the bus isn't released (no STOP) so a
	/// following `receive` continues with a repeated START.
	fn send(&mut self, device: DeviceAddress, bytes: &[u8], keep_bus_active: bool) -> BusStatus;

	/// Read exactly `length` bytes from `device` as one read transaction.
	fn receive(&mut self, device: DeviceAddress, length: usize, keep_bus_active: bool) -> Result<Vec<u8>, BusStatus>;

	// "acknowledge polling": a device in a write cycle NACKs its address
	fn is_ready(&mut self, device: DeviceAddress) -> bool {
		self.send(device, &[], false).is_ok()
	}

	fn delay(&mut self, duration: Duration) {
		reliable_sleep(duration);
	}
}

impl<'a, B: BusTransport + ?Sized> BusTransport for &'a mut B {
	fn send(&mut self, device: DeviceAddress, bytes: &[u8], keep_bus_active: bool) -> BusStatus {
		(**self).send(device, bytes, keep_bus_active)
	}

	fn receive(&mut self, device: DeviceAddress, length: usize, keep_bus_active: bool) -> Result<Vec<u8>, BusStatus> {
		(**self).receive(device, length, keep_bus_active)
	}

	fn is_ready(&mut self, device: DeviceAddress) -> bool {
		(**self).is_ready(device)
	}

	fn delay(&mut self, duration: Duration) {
		(**self).delay(duration)
	}
}
