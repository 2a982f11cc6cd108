use crate::i2c::{
	BusStatus,
	BusTransport,
};

use super::DeviceAddress;

/// Remembers the status of the last bus transaction.
///
/// With checking enabled the first fault blocks all further bus activity
/// until the latch is reset: reads return zeros and writes are dropped.
/// Without checking every transaction is attempted and only the status is
/// tracked.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ErrorLatch {
	check_enabled: bool,
	last_error: BusStatus,
}

impl ErrorLatch {
	pub fn new(check_enabled: bool) -> Self {
		ErrorLatch {
			check_enabled,
			last_error: BusStatus::OK,
		}
	}

	pub fn reset(&mut self, check_enabled: bool) {
		self.check_enabled = check_enabled;
		self.last_error = BusStatus::OK;
	}

	pub fn check_enabled(&self) -> bool {
		self.check_enabled
	}

	pub fn last_error(&self) -> BusStatus {
		self.last_error
	}

	/// whether bus transactions are currently suppressed
	pub fn is_blocking(&self) -> bool {
		self.check_enabled && self.last_error.is_err()
	}

	/// whether recording `status` is the first fault of a checked latch
	pub fn notifies(&self, status: BusStatus) -> bool {
		self.check_enabled && self.last_error.is_ok() && status.is_err()
	}

	fn record(&mut self, device: DeviceAddress, status: BusStatus) {
		if self.notifies(status) {
			error!("I2C {}: bus fault {}, blocking further transactions", device, status);
		} else if status.is_err() {
			debug!("I2C {}: bus fault {}", device, status);
		}
		self.last_error = status;
	}

	/// Send through the latch; returns whether the bus was accessed.
	pub fn send<B>(&mut self, bus: &mut B, device: DeviceAddress, bytes: &[u8], keep_bus_active: bool) -> bool
	where
		B: BusTransport + ?Sized,
	{
		if self.is_blocking() {
			trace!("I2C {}: suppressed send of {} bytes", device, bytes.len());
			return false;
		}
		let status = bus.send(device, bytes, keep_bus_active);
		trace!("I2C {}: send {:02x?} -> {}", device, bytes, status);
		self.record(device, status);
		true
	}

	/// Receive through the latch; suppressed or failed reads yield zeros.
	pub fn receive<B>(&mut self, bus: &mut B, device: DeviceAddress, length: usize, keep_bus_active: bool) -> Vec<u8>
	where
		B: BusTransport + ?Sized,
	{
		if self.is_blocking() {
			trace!("I2C {}: suppressed receive of {} bytes", device, length);
			return vec![0u8; length];
		}
		match bus.receive(device, length, keep_bus_active) {
			Ok(ref data) if data.len() != length => {
				debug!("I2C {}: received {} of {} bytes", device, data.len(), length);
				self.record(device, BusStatus::INVALID);
				vec![0u8; length]
			},
			Ok(data) => {
				trace!("I2C {}: received {:02x?}", device, data);
				data
			},
			Err(status) => {
				self.record(device, status);
				vec![0u8; length]
			},
		}
	}
}
