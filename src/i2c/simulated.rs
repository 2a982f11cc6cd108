use std::collections::BTreeMap;
use std::time::Duration;

use crate::eeprom::{
	AddressSpace,
	DeviceAddress,
};

use super::{
	BusStatus,
	BusTransport,
};

/// One transaction seen by a `SimulatedEeprom`, in bus order.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Transaction {
	Send {
		device: DeviceAddress,
		bytes: Vec<u8>,
		keep_bus_active: bool,
	},
	Receive {
		device: DeviceAddress,
		length: usize,
	},
	Delay(Duration),
}

impl Transaction {
	/// whether this is a write carrying payload (i.e. starts a write cycle)
	pub fn is_data_write(&self, address_width: usize) -> bool {
		match self {
			Transaction::Send { bytes, .. } => bytes.len() > address_width,
			_ => false,
		}
	}
}

#[derive(Clone, Debug)]
struct SimulatedDevice {
	memory: Vec<u8>,
	pointer: u32,
	busy_until: Duration,
}

/// In-memory model of one or more 24XX EEPROMs on a bus.
///
/// Behaves like the real part where it matters for a driver: payload wraps
/// inside the addressed page, the device NACKs while a write cycle runs,
/// reads continue at the internal address pointer, and messages longer than
/// the bus buffer are rejected. Time is virtual: `delay` only advances the
/// clock.
#[derive(Clone, Debug)]
pub struct SimulatedEeprom {
	space: AddressSpace,
	devices: BTreeMap<DeviceAddress, SimulatedDevice>,
	clock: Duration,
	pending_faults: u32,
	log: Vec<Transaction>,
}

impl SimulatedEeprom {
	pub fn new(space: AddressSpace) -> Self {
		SimulatedEeprom {
			space,
			devices: BTreeMap::new(),
			clock: Duration::from_millis(0),
			pending_faults: 0,
			log: Vec::new(),
		}
	}

	/// Attach an erased (all `0xff`) device.
	pub fn with_device(mut self, device: DeviceAddress) -> Self {
		self.attach(device);
		self
	}

	pub fn attach(&mut self, device: DeviceAddress) {
		let memory = vec![0xff; self.space.memory_size as usize];
		self.devices.insert(device, SimulatedDevice {
			memory,
			pointer: 0,
			busy_until: Duration::from_millis(0),
		});
	}

	pub fn detach(&mut self, device: DeviceAddress) {
		self.devices.remove(&device);
	}

	pub fn memory(&self, device: DeviceAddress) -> Option<&[u8]> {
		self.devices.get(&device).map(|d| &d.memory[..])
	}

	pub fn memory_mut(&mut self, device: DeviceAddress) -> Option<&mut [u8]> {
		self.devices.get_mut(&device).map(|d| &mut d.memory[..])
	}

	/// Let the next `count` bus transactions fail with a NACK.
	pub fn inject_faults(&mut self, count: u32) {
		self.pending_faults += count;
	}

	/// Total time spent in `delay`.
	pub fn elapsed(&self) -> Duration {
		self.clock
	}

	pub fn transactions(&self) -> &[Transaction] {
		&self.log
	}

	/// Transactions that actually touched the bus (everything but delays).
	pub fn bus_transactions(&self) -> Vec<&Transaction> {
		self.log.iter().filter(|t| match t {
			Transaction::Delay(_) => false,
			_ => true,
		}).collect()
	}

	pub fn data_writes(&self) -> usize {
		let width = self.space.address_width as usize;
		self.log.iter().filter(|t| t.is_data_write(width)).count()
	}

	pub fn clear_transactions(&mut self) {
		self.log.clear();
	}

	fn take_fault(&mut self) -> bool {
		if self.pending_faults > 0 {
			self.pending_faults -= 1;
			true
		} else {
			false
		}
	}

	// common address phase checks; returns the addressed device
	fn select(&mut self, device: DeviceAddress) -> Result<&mut SimulatedDevice, BusStatus> {
		if self.take_fault() {
			return Err(BusStatus::NACK);
		}
		let clock = self.clock;
		match self.devices.get_mut(&device) {
			None => Err(BusStatus::NACK),
			// still in the write cycle
			Some(d) => if clock < d.busy_until {
				Err(BusStatus::NACK)
			} else {
				Ok(d)
			},
		}
	}
}

impl BusTransport for SimulatedEeprom {
	fn send(&mut self, device: DeviceAddress, bytes: &[u8], keep_bus_active: bool) -> BusStatus {
		self.log.push(Transaction::Send {
			device,
			bytes: bytes.to_vec(),
			keep_bus_active,
		});

		let space = self.space;
		let settle_until = self.clock + space.settle_time();
		let dev = match self.select(device) {
			Err(status) => return status,
			Ok(dev) => dev,
		};

		let width = space.address_width as usize;
		if bytes.is_empty() {
			// address probe
			return BusStatus::OK;
		}
		if bytes.len() < width || bytes.len() > space.max_bus_chunk as usize {
			return BusStatus::INVALID;
		}

		let address = bytes[..width].iter().fold(0u32, |a, &b| a << 8 | b as u32) % space.memory_size;
		let payload = &bytes[width..];
		if payload.is_empty() {
			dev.pointer = address;
			return BusStatus::OK;
		}

		let page_start = address - address % space.page_size;
		let mut in_page = address % space.page_size;
		for &b in payload {
			dev.memory[(page_start + in_page) as usize] = b;
			in_page = (in_page + 1) % space.page_size;
		}
		dev.pointer = page_start + in_page;
		dev.busy_until = settle_until;
		BusStatus::OK
	}

	fn receive(&mut self, device: DeviceAddress, length: usize, _keep_bus_active: bool) -> Result<Vec<u8>, BusStatus> {
		self.log.push(Transaction::Receive { device, length });

		let memory_size = self.space.memory_size;
		let max_bus_chunk = self.space.max_bus_chunk as usize;
		let dev = self.select(device)?;
		if length > max_bus_chunk {
			return Err(BusStatus::INVALID);
		}

		let mut data = Vec::with_capacity(length);
		for _ in 0..length {
			data.push(dev.memory[dev.pointer as usize]);
			dev.pointer = (dev.pointer + 1) % memory_size;
		}
		Ok(data)
	}

	fn delay(&mut self, duration: Duration) {
		self.log.push(Transaction::Delay(duration));
		self.clock += duration;
	}
}
