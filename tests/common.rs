#![allow(dead_code)]

use cat24c512_eeprom::i2c::SimulatedEeprom;
use cat24c512_eeprom::{
	AddressSpace,
	DeviceAddress,
	DriverConfig,
	EepromDriver,
};

pub const DEV: DeviceAddress = DeviceAddress::DEFAULT;

pub type SimDriver = EepromDriver<SimulatedEeprom>;

pub fn driver(config: DriverConfig) -> SimDriver {
	driver_with_space(AddressSpace::CAT24C512, config)
}

pub fn driver_with_space(space: AddressSpace, config: DriverConfig) -> SimDriver {
	let sim = SimulatedEeprom::new(space).with_device(DEV);
	EepromDriver::new(sim, space, config).unwrap()
}

pub fn checked() -> DriverConfig {
	DriverConfig {
		check_errors: true,
		..DriverConfig::default()
	}
}

pub fn memory(driver: &SimDriver) -> &[u8] {
	driver.bus().memory(DEV).unwrap()
}

// distinct values within any 256 byte window
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
	(0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
