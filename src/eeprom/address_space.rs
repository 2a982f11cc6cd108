use std::fmt;
use std::str;
use std::time::Duration;

/// Geometry and timing of one EEPROM family.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AddressSpace {
	pub memory_size: u32,
	pub page_size: u32,
	/// bytes of the address field preceding each transaction
	pub address_width: u8,
	/// maximum bytes per bus transaction (including the address field)
	pub max_bus_chunk: u32,
	/// page write cycle time
	pub settle_time_ms: u32,
}

impl AddressSpace {
	/// CAT24C512 / 24XX512: 524288 bit (65536 bytes), 128 byte pages,
	/// 2 address bytes. The bus limit is the 32 byte buffer of the usual
	/// host controllers.
	pub const CAT24C512: AddressSpace = AddressSpace {
		memory_size: 65536,
		page_size: 128,
		address_width: 2,
		max_bus_chunk: 32,
		// all 24XX EEPROMs seem to have a max write time of 5ms
		settle_time_ms: 5,
	};

	pub fn page_of(&self, address: u32) -> u32 {
		address / self.page_size
	}

	pub fn pages(&self) -> u32 {
		self.memory_size / self.page_size
	}

	pub fn contains(&self, address: u32) -> bool {
		address < self.memory_size
	}

	/// Shorten `length` so `[start, start + length)` stays inside memory.
	pub fn clamp_length(&self, start: u32, length: usize) -> u32 {
		let available = self.memory_size.saturating_sub(start);
		if length > available as usize {
			available
		} else {
			length as u32
		}
	}

	pub fn page_address(&self, page: u32) -> crate::AResult<u32> {
		ensure!(page < self.pages(), "page {} out of range (device has {} pages)", page, self.pages());
		Ok(page * self.page_size)
	}

	pub fn settle_time(&self) -> Duration {
		Duration::from_millis(self.settle_time_ms as u64)
	}

	/// Big endian address field for a transaction.
	pub fn encode_address(&self, address: u32) -> Vec<u8> {
		let bytes = address.to_be_bytes();
		let width = (self.address_width as usize).min(bytes.len());
		bytes[bytes.len() - width..].to_vec()
	}

	/// Largest payload of a single write transaction.
	pub fn max_write_size(&self) -> crate::AResult<u32> {
		let bus_payload = self.max_bus_chunk.saturating_sub(self.address_width as u32);
		let size = self.page_size.min(bus_payload);
		ensure!(size > 0,
			"bus limit {} can't carry {} address bytes plus payload (page size {})",
			self.max_bus_chunk, self.address_width, self.page_size,
		);
		Ok(size)
	}

	/// Largest payload of a single read transaction.
	pub fn max_read_size(&self) -> crate::AResult<u32> {
		ensure!(self.max_bus_chunk > 0, "bus limit must be at least one byte");
		Ok(self.max_bus_chunk)
	}

	pub fn validate(&self) -> crate::AResult<()> {
		ensure!(self.page_size > 0, "page size must not be zero");
		ensure!(self.memory_size % self.page_size == 0,
			"memory size {} isn't a multiple of the page size {}", self.memory_size, self.page_size);
		ensure!(self.address_width > 0 && self.address_width <= 4,
			"unsupported address width {}", self.address_width);
		ensure!(self.address_width == 4 || (self.memory_size as u64) <= 1u64 << (8 * self.address_width as u32),
			"memory size {} not addressable with {} address bytes", self.memory_size, self.address_width);
		self.max_write_size()?;
		self.max_read_size()?;
		Ok(())
	}
}

impl Default for AddressSpace {
	fn default() -> Self {
		AddressSpace::CAT24C512
	}
}

/// 7-bit bus address of a 24XX512; A2..A0 pins select 0x50..0x57.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
	pub const BASE: u8 = 0x50;
	pub const DEFAULT: DeviceAddress = DeviceAddress(DeviceAddress::BASE);

	pub fn new(address: u8) -> crate::AResult<Self> {
		ensure!(address & !0x07 == DeviceAddress::BASE,
			"invalid EEPROM bus address 0x{:02x} (expected 0x50..0x57)", address);
		Ok(DeviceAddress(address))
	}

	/// address selected by the A2..A0 pins
	pub fn from_pins(pins: u8) -> Self {
		DeviceAddress(DeviceAddress::BASE | (pins & 0x07))
	}

	pub fn value(&self) -> u8 {
		self.0
	}

	pub fn pins(&self) -> u8 {
		self.0 & 0x07
	}
}

impl Default for DeviceAddress {
	fn default() -> Self {
		DeviceAddress::DEFAULT
	}
}

impl fmt::Debug for DeviceAddress {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "DeviceAddress(0x{:02x})", self.0)
	}
}

impl fmt::Display for DeviceAddress {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{:02x}", self.0)
	}
}

impl str::FromStr for DeviceAddress {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		// short: 50, long: 0x50
		let digits = if s.starts_with("0x") || s.starts_with("0X") {
			&s[2..]
		} else {
			s
		};
		ensure!(!digits.is_empty() && digits.len() <= 2, "invalid EEPROM bus address: {:?}", s);

		let address = with_context!(("invalid EEPROM bus address: {:?}", s),
			Ok(u8::from_str_radix(digits, 16)?)
		)?;
		DeviceAddress::new(address)
	}
}
