//! Driver for CAT24C512 (and compatible 24XX) I2C EEPROMs.
//!
//! Transfers are split into bus transactions by the `ChunkPlanner`: a write
//! transaction carries the 2-byte address plus at most `max_bus_chunk - 2`
//! payload bytes and never crosses a 128 byte page line; a read sends the
//! address first and then receives up to `max_bus_chunk` bytes.
//!
//! After each page write the device is busy for the write cycle time (5ms);
//! the driver waits for it (plus a fixed guard), or polls the device when
//! `poll_for_write_complete` is set.
//!
//! Bus faults don't turn into errors: they are collected in the
//! `ErrorLatch`, see `last_error`. Errors are only returned for invalid
//! arguments, invalid device constants and a device that stays busy.

use std::time::Duration;

use crate::i2c::{
	BusStatus,
	BusTransport,
};

mod address_space;
mod chunk;
mod latch;
mod number;

pub use self::address_space::{
	AddressSpace,
	DeviceAddress,
};

pub use self::chunk::{
	Chunk,
	ChunkPlanner,
};

pub use self::latch::ErrorLatch;

pub use self::number::NumberFormat;

/// `read_array` returns at most this many bytes
pub const READ_ARRAY_MAX: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DriverConfig {
	/// block all bus activity after the first fault (until `start`)
	pub check_errors: bool,
	/// poll the device before each transaction instead of waiting the
	/// page write time
	pub poll_for_write_complete: bool,
	/// fixed delay after each page write
	pub guard_delay: Duration,
	pub poll_interval: Duration,
	pub max_poll_attempts: u32,
}

impl Default for DriverConfig {
	fn default() -> Self {
		DriverConfig {
			check_errors: false,
			poll_for_write_complete: false,
			guard_delay: Duration::from_millis(5),
			poll_interval: Duration::from_millis(1),
			max_poll_attempts: 100,
		}
	}
}

pub struct EepromDriver<B: BusTransport> {
	bus: B,
	planner: ChunkPlanner,
	config: DriverConfig,
	latch: ErrorLatch,
}

impl<B: BusTransport> EepromDriver<B> {
	pub fn new(bus: B, space: AddressSpace, config: DriverConfig) -> crate::AResult<Self> {
		with_context!("invalid EEPROM address space", space.validate())?;

		Ok(EepromDriver {
			bus,
			planner: ChunkPlanner::new(space),
			latch: ErrorLatch::new(config.check_errors),
			config,
		})
	}

	/// (Re)initialize: select error checking mode and clear the latched error.
	pub fn start(&mut self, check_errors: bool) {
		self.config.check_errors = check_errors;
		self.latch.reset(check_errors);
	}

	pub fn last_error(&self) -> BusStatus {
		self.latch.last_error()
	}

	pub fn latch(&self) -> &ErrorLatch {
		&self.latch
	}

	pub fn config(&self) -> &DriverConfig {
		&self.config
	}

	pub fn address_space(&self) -> &AddressSpace {
		self.planner.address_space()
	}

	pub fn bus(&self) -> &B {
		&self.bus
	}

	pub fn bus_mut(&mut self) -> &mut B {
		&mut self.bus
	}

	pub fn into_bus(self) -> B {
		self.bus
	}

	fn ensure_inside(&self, address: u32, size: usize) -> crate::AResult<()> {
		let space = self.planner.address_space();
		ensure!(space.clamp_length(address, size) as usize == size,
			"{} bytes at 0x{:04x} exceed memory size {}", size, address, space.memory_size);
		Ok(())
	}

	fn warn_if_clamped(&self, what: &str, address: u32, requested: usize, chunks: &[Chunk]) -> usize {
		let length: usize = chunks.iter().map(|c| c.length as usize).sum();
		if length < requested {
			warn!("{} of {} bytes at 0x{:04x} clamped to {} bytes (memory size {})",
				what, requested, address, length, self.planner.address_space().memory_size);
		}
		length
	}

	// wait for the device to finish a previous write cycle
	fn wait_until_ready(&mut self, device: DeviceAddress) -> crate::AResult<()> {
		if !self.config.poll_for_write_complete || self.latch.is_blocking() {
			return Ok(());
		}
		for _ in 0..self.config.max_poll_attempts {
			if self.bus.is_ready(device) {
				return Ok(());
			}
			self.bus.delay(self.config.poll_interval);
		}
		bail!("EEPROM {}: timeout - still busy after {} polls", device, self.config.max_poll_attempts);
	}

	pub fn read_buffer(&mut self, device: DeviceAddress, address: u32, num_bytes: usize) -> crate::AResult<Vec<u8>> {
		let space = *self.planner.address_space();
		let chunks = self.planner.plan_read(address, num_bytes)?;
		let length = self.warn_if_clamped("read", address, num_bytes, &chunks);

		let mut data = Vec::with_capacity(length);
		for chunk in chunks {
			self.wait_until_ready(device)?;

			let chunk_address = address + chunk.offset;
			debug!("EEPROM {}: read {} bytes at 0x{:04x}", device, chunk.length, chunk_address);
			self.latch.send(&mut self.bus, device, &space.encode_address(chunk_address), true);
			data.extend(self.latch.receive(&mut self.bus, device, chunk.length as usize, false));
		}
		Ok(data)
	}

	pub fn read_byte(&mut self, device: DeviceAddress, address: u32) -> crate::AResult<u8> {
		self.ensure_inside(address, 1)?;
		Ok(self.read_buffer(device, address, 1)?[0])
	}

	pub fn read_number(&mut self, device: DeviceAddress, address: u32, format: NumberFormat) -> crate::AResult<f64> {
		self.ensure_inside(address, format.size())?;
		let data = self.read_buffer(device, address, format.size())?;
		format.decode(&data)
	}

	/// Invalid UTF-8 sequences are replaced.
	pub fn read_string(&mut self, device: DeviceAddress, address: u32, length: usize) -> crate::AResult<String> {
		let data = self.read_buffer(device, address, length)?;
		Ok(String::from_utf8_lossy(&data).into_owned())
	}

	pub fn read_array(&mut self, device: DeviceAddress, address: u32, num_bytes: usize) -> crate::AResult<Vec<i8>> {
		ensure!(num_bytes <= READ_ARRAY_MAX, "can read at most {} bytes as array, not {}", READ_ARRAY_MAX, num_bytes);
		let data = self.read_buffer(device, address, num_bytes)?;
		Ok(data.into_iter().map(|b| b as i8).collect())
	}

	/// Returns the number of bytes sent to the device; less than
	/// `data.len()` if the data didn't fit before the end of the memory, and
	/// 0 while the error latch blocks the bus.
	pub fn write_buffer(&mut self, device: DeviceAddress, address: u32, data: &[u8]) -> crate::AResult<usize> {
		let space = *self.planner.address_space();
		let chunks = self.planner.plan_write(address, data.len())?;
		self.warn_if_clamped("write", address, data.len(), &chunks);

		let mut written = 0;
		for chunk in chunks {
			self.wait_until_ready(device)?;

			let chunk_address = address + chunk.offset;
			debug!("EEPROM {}: write {} bytes at 0x{:04x}", device, chunk.length, chunk_address);
			let mut message = space.encode_address(chunk_address);
			message.extend_from_slice(&data[chunk.range()]);
			if !self.latch.send(&mut self.bus, device, &message, false) {
				continue;
			}
			written += chunk.length as usize;

			if !self.config.poll_for_write_complete {
				self.bus.delay(space.settle_time());
			}
			// probing a busy device spams the bus with errors; always keep a gap
			self.bus.delay(self.config.guard_delay);
		}
		Ok(written)
	}

	/// Only writes if the stored byte differs; returns whether it did.
	pub fn write_byte(&mut self, device: DeviceAddress, address: u32, value: u8) -> crate::AResult<bool> {
		if self.read_byte(device, address)? == value {
			debug!("EEPROM {}: byte at 0x{:04x} unchanged", device, address);
			return Ok(false);
		}
		Ok(self.write_buffer(device, address, &[value])? > 0)
	}

	/// Only writes if the stored value differs; returns whether it did.
	///
	/// Stored and new value are equal if their encodings match (this covers
	/// NaN) or if they decode to the same number (this covers -0.0 over 0.0).
	pub fn write_number(&mut self, device: DeviceAddress, address: u32, value: f64, format: NumberFormat) -> crate::AResult<bool> {
		self.ensure_inside(address, format.size())?;
		let encoded = format.encode(value);
		let existing = self.read_buffer(device, address, encoded.len())?;
		if existing == encoded || format.decode(&existing)? == value {
			debug!("EEPROM {}: {} at 0x{:04x} unchanged", device, format, address);
			return Ok(false);
		}
		Ok(self.write_buffer(device, address, &encoded)? > 0)
	}

	/// Writes the UTF-8 bytes of `text` (no terminator).
	pub fn write_string(&mut self, device: DeviceAddress, address: u32, text: &str) -> crate::AResult<usize> {
		self.write_buffer(device, address, text.as_bytes())
	}

	pub fn write_array(&mut self, device: DeviceAddress, address: u32, values: &[i8]) -> crate::AResult<usize> {
		let data: Vec<u8> = values.iter().map(|&v| v as u8).collect();
		self.write_buffer(device, address, &data)
	}

	/// Fill one page (starting at `page_start`) with `fill`.
	pub fn erase_page(&mut self, device: DeviceAddress, page_start: u32, fill: u8) -> crate::AResult<usize> {
		let page = vec![fill; self.planner.address_space().page_size as usize];
		self.write_buffer(device, page_start, &page)
	}

	pub fn erase_all(&mut self, device: DeviceAddress, fill: u8) -> crate::AResult<()> {
		let space = *self.planner.address_space();
		for page in 0..space.pages() {
			self.erase_page(device, space.page_address(page)?, fill)?;
		}
		debug!("EEPROM {}: erased {} pages with 0x{:02x}", device, space.pages(), fill);
		Ok(())
	}
}
