mod common;

mod read_write {
	use crate::common::{
		self,
		DEV,
	};
	use cat24c512_eeprom::i2c::Transaction;
	use cat24c512_eeprom::{
		AddressSpace,
		BusStatus,
		DriverConfig,
		NumberFormat,
	};
	use pretty_assertions::assert_eq;

	#[test]
	fn round_trip_across_page_line() {
		let mut driver = common::driver(DriverConfig::default());
		let data = common::pattern(140, 7);

		assert_eq!(driver.write_buffer(DEV, 120, &data).unwrap(), 140);
		assert_eq!(driver.read_buffer(DEV, 120, 140).unwrap(), data);
		assert_eq!(&common::memory(&driver)[120..260], &data[..]);
		assert_eq!(driver.last_error(), BusStatus::OK);
		// 8 + 4 * 30 + 8 + 4
		assert_eq!(driver.bus().data_writes(), 7);
	}

	#[test]
	fn round_trip_various_ranges() {
		let ranges: &[(u32, usize)] = &[
			(0, 1),
			(0, 300),
			(127, 2),
			(5, 128),
			(1000, 255),
			(4095, 77),
			(65536 - 300, 300),
		];
		for (i, &(address, length)) in ranges.iter().enumerate() {
			let mut driver = common::driver(DriverConfig::default());
			let data = common::pattern(length, i as u8);
			assert_eq!(driver.write_buffer(DEV, address, &data).unwrap(), length);
			assert_eq!(driver.read_buffer(DEV, address, length).unwrap(), data, "range {}+{}", address, length);
			assert_eq!(driver.last_error(), BusStatus::OK);
		}
	}

	#[test]
	fn write_messages_fit_bus_and_page() {
		let mut driver = common::driver(DriverConfig::default());
		driver.write_buffer(DEV, 100, &common::pattern(200, 1)).unwrap();

		for t in driver.bus().transactions() {
			if let Transaction::Send { bytes, keep_bus_active, .. } = t {
				assert!(bytes.len() <= 32);
				assert!(!keep_bus_active);
				let address = (bytes[0] as u32) << 8 | bytes[1] as u32;
				let last = address + (bytes.len() as u32 - 2) - 1;
				assert_eq!(address / 128, last / 128, "write at 0x{:04x} crosses a page", address);
			}
		}
	}

	#[test]
	fn reads_address_every_chunk() {
		let mut driver = common::driver(DriverConfig::default());
		driver.read_buffer(DEV, 100, 70).unwrap();

		let expected = vec![
			Transaction::Send { device: DEV, bytes: vec![0, 100], keep_bus_active: true },
			Transaction::Receive { device: DEV, length: 32 },
			Transaction::Send { device: DEV, bytes: vec![0, 132], keep_bus_active: true },
			Transaction::Receive { device: DEV, length: 32 },
			Transaction::Send { device: DEV, bytes: vec![0, 164], keep_bus_active: true },
			Transaction::Receive { device: DEV, length: 6 },
		];
		assert_eq!(driver.bus().transactions(), &expected[..]);
	}

	#[test]
	fn write_is_clamped_at_end_of_memory() {
		let mut driver = common::driver(DriverConfig::default());
		let data = common::pattern(50, 3);

		assert_eq!(driver.write_buffer(DEV, 65536 - 10, &data).unwrap(), 10);
		assert_eq!(driver.read_buffer(DEV, 65536 - 10, 50).unwrap(), &data[..10]);
		// nothing wrapped around to the start
		assert!(common::memory(&driver)[..40].iter().all(|&b| b == 0xff));
		assert_eq!(driver.last_error(), BusStatus::OK);
	}

	#[test]
	fn transfer_outside_memory_does_nothing() {
		let mut driver = common::driver(DriverConfig::default());
		assert_eq!(driver.write_buffer(DEV, 65536, &[1, 2, 3]).unwrap(), 0);
		assert_eq!(driver.read_buffer(DEV, 70000, 3).unwrap(), Vec::<u8>::new());
		assert!(driver.bus().transactions().is_empty());
		assert!(driver.read_byte(DEV, 65536).is_err());
	}

	#[test]
	fn numbers() {
		let mut driver = common::driver(DriverConfig::default());

		// straddles the page line at 128
		assert!(driver.write_number(DEV, 126, 0x1234_5678 as f64, NumberFormat::UInt32BE).unwrap());
		assert_eq!(&common::memory(&driver)[126..130], &[0x12, 0x34, 0x56, 0x78]);
		assert_eq!(driver.read_number(DEV, 126, NumberFormat::UInt32BE).unwrap(), 0x1234_5678 as f64);
		assert_eq!(driver.read_number(DEV, 126, NumberFormat::UInt16LE).unwrap(), 0x3412 as f64);

		driver.write_number(DEV, 200, -1.5, NumberFormat::Float32LE).unwrap();
		assert_eq!(driver.read_number(DEV, 200, NumberFormat::Float32LE).unwrap(), -1.5);

		driver.write_number(DEV, 300, -2.0, NumberFormat::Int16BE).unwrap();
		assert_eq!(driver.read_number(DEV, 300, NumberFormat::Int16BE).unwrap(), -2.0);
		assert_eq!(driver.read_number(DEV, 300, NumberFormat::UInt16BE).unwrap(), 0xfffe as f64);

		assert!(driver.read_number(DEV, 65535, NumberFormat::UInt16BE).is_err());
		assert!(driver.write_number(DEV, 65534, 1.0, NumberFormat::Float32BE).is_err());
	}

	#[test]
	fn strings_and_arrays() {
		let mut driver = common::driver(DriverConfig::default());

		assert_eq!(driver.write_string(DEV, 300, "Hallo Welt").unwrap(), 10);
		assert_eq!(driver.read_string(DEV, 300, 10).unwrap(), "Hallo Welt");
		assert_eq!(driver.read_string(DEV, 300, 5).unwrap(), "Hallo");

		driver.write_array(DEV, 500, &[-1, 5, -128, 127]).unwrap();
		assert_eq!(driver.read_array(DEV, 500, 4).unwrap(), vec![-1, 5, -128, 127]);
		assert_eq!(driver.read_byte(DEV, 500).unwrap(), 0xff);
		assert!(driver.read_array(DEV, 500, 33).is_err());
	}

	#[test]
	fn erase_page() {
		let mut driver = common::driver(DriverConfig::default());
		assert_eq!(driver.erase_page(DEV, 256, 0x00).unwrap(), 128);

		let memory = common::memory(&driver);
		assert!(memory[256..384].iter().all(|&b| b == 0x00));
		assert_eq!(memory[255], 0xff);
		assert_eq!(memory[384], 0xff);
	}

	#[test]
	fn erase_all() {
		let space = AddressSpace { memory_size: 1024, ..AddressSpace::CAT24C512 };
		let mut driver = common::driver_with_space(space, DriverConfig::default());
		driver.erase_all(DEV, 0x5a).unwrap();

		assert!(common::memory(&driver).iter().all(|&b| b == 0x5a));
		assert_eq!(driver.last_error(), BusStatus::OK);
	}

	#[test]
	fn whole_page_writes_with_large_bus_buffer() {
		let space = AddressSpace { max_bus_chunk: 2 + 128, ..AddressSpace::CAT24C512 };
		let mut driver = common::driver_with_space(space, DriverConfig::default());
		let data = common::pattern(256, 9);

		driver.write_buffer(DEV, 64, &data).unwrap();
		assert_eq!(driver.bus().data_writes(), 3);
		assert_eq!(driver.read_buffer(DEV, 64, 256).unwrap(), data);
	}

	#[test]
	fn unusable_bus_limit_is_rejected() {
		let space = AddressSpace { max_bus_chunk: 2, ..AddressSpace::CAT24C512 };
		let sim = cat24c512_eeprom::i2c::SimulatedEeprom::new(space).with_device(DEV);
		assert!(cat24c512_eeprom::EepromDriver::new(sim, space, DriverConfig::default()).is_err());
	}
}

mod dirty_check {
	use crate::common::{
		self,
		DEV,
	};
	use cat24c512_eeprom::{
		DriverConfig,
		NumberFormat,
	};
	use pretty_assertions::assert_eq;

	#[test]
	fn same_byte_written_once() {
		let mut driver = common::driver(DriverConfig::default());

		assert!(driver.write_byte(DEV, 10, 0x42).unwrap());
		assert_eq!(driver.bus().data_writes(), 1);

		assert!(!driver.write_byte(DEV, 10, 0x42).unwrap());
		assert_eq!(driver.bus().data_writes(), 1);
		assert_eq!(driver.read_byte(DEV, 10).unwrap(), 0x42);
	}

	#[test]
	fn erased_byte_not_rewritten() {
		let mut driver = common::driver(DriverConfig::default());
		assert!(!driver.write_byte(DEV, 11, 0xff).unwrap());
		assert_eq!(driver.bus().data_writes(), 0);
	}

	#[test]
	fn same_number_written_once() {
		let mut driver = common::driver(DriverConfig::default());

		assert!(driver.write_number(DEV, 40, 1234.0, NumberFormat::UInt16LE).unwrap());
		assert!(!driver.write_number(DEV, 40, 1234.0, NumberFormat::UInt16LE).unwrap());
		assert!(driver.write_number(DEV, 40, 1235.0, NumberFormat::UInt16LE).unwrap());
		assert_eq!(driver.bus().data_writes(), 2);
	}

	#[test]
	fn signed_zero_equals_zero() {
		let mut driver = common::driver(DriverConfig::default());

		assert!(driver.write_number(DEV, 60, 0.0, NumberFormat::Float32LE).unwrap());
		assert!(!driver.write_number(DEV, 60, -0.0, NumberFormat::Float32LE).unwrap());
		assert_eq!(driver.bus().data_writes(), 1);
		assert_eq!(&common::memory(&driver)[60..64], &[0, 0, 0, 0]);
	}

	#[test]
	fn nan_written_once() {
		let mut driver = common::driver(DriverConfig::default());

		assert!(driver.write_number(DEV, 70, std::f64::NAN, NumberFormat::Float64BE).unwrap());
		assert!(!driver.write_number(DEV, 70, std::f64::NAN, NumberFormat::Float64BE).unwrap());
		assert_eq!(driver.bus().data_writes(), 1);
	}

	#[test]
	fn buffers_always_written() {
		let mut driver = common::driver(DriverConfig::default());
		driver.write_buffer(DEV, 0, &[0xff, 0xff]).unwrap();
		driver.write_string(DEV, 0, "ab").unwrap();
		driver.write_string(DEV, 0, "ab").unwrap();
		assert_eq!(driver.bus().data_writes(), 3);
	}
}

mod latch {
	use crate::common::{
		self,
		DEV,
	};
	use cat24c512_eeprom::{
		AddressSpace,
		BusStatus,
		BusTransport,
		DeviceAddress,
		DriverConfig,
		EepromDriver,
		NumberFormat,
	};
	use pretty_assertions::assert_eq;

	// acknowledges everything but never returns any data
	struct EmptyReadBus;

	impl BusTransport for EmptyReadBus {
		fn send(&mut self, _device: DeviceAddress, _bytes: &[u8], _keep_bus_active: bool) -> BusStatus {
			BusStatus::OK
		}

		fn receive(&mut self, _device: DeviceAddress, _length: usize, _keep_bus_active: bool) -> Result<Vec<u8>, BusStatus> {
			Ok(Vec::new())
		}
	}

	#[test]
	fn short_read_is_latched() {
		let mut driver = EepromDriver::new(EmptyReadBus, AddressSpace::CAT24C512, DriverConfig::default()).unwrap();
		assert_eq!(driver.read_byte(DEV, 0).unwrap(), 0);
		assert_eq!(driver.last_error(), BusStatus::INVALID);
		assert_eq!(driver.read_buffer(DEV, 100, 40).unwrap(), vec![0u8; 40]);
		assert_eq!(driver.read_number(DEV, 0, NumberFormat::Int32LE).unwrap(), 0.0);
	}

	#[test]
	fn checked_fault_suppresses_until_start() {
		let mut driver = common::driver(common::checked());
		driver.bus_mut().inject_faults(1);

		// address phase fails, data phase is suppressed
		assert_eq!(driver.read_byte(DEV, 0).unwrap(), 0);
		assert_eq!(driver.last_error(), BusStatus::NACK);
		assert_eq!(driver.bus().bus_transactions().len(), 1);

		driver.bus_mut().clear_transactions();
		assert_eq!(driver.read_byte(DEV, 0).unwrap(), 0);
		assert_eq!(driver.read_buffer(DEV, 0, 100).unwrap(), vec![0u8; 100]);
		assert!(!driver.write_byte(DEV, 0, 0x33).unwrap());
		assert!(!driver.write_number(DEV, 0, 7.0, NumberFormat::UInt16BE).unwrap());
		assert_eq!(driver.write_buffer(DEV, 0, &[1; 128]).unwrap(), 0);
		assert_eq!(driver.erase_page(DEV, 0, 0x00).unwrap(), 0);
		assert!(driver.bus().transactions().is_empty());
		assert_eq!(common::memory(&driver)[0], 0xff);
		assert_eq!(driver.last_error(), BusStatus::NACK);

		driver.start(true);
		assert_eq!(driver.last_error(), BusStatus::OK);
		assert_eq!(driver.read_byte(DEV, 0).unwrap(), 0xff);
	}

	#[test]
	fn unchecked_faults_retry_every_call() {
		let absent = DeviceAddress::from_pins(1);
		let mut driver = common::driver(DriverConfig::default());

		assert_eq!(driver.read_byte(absent, 0).unwrap(), 0);
		assert_eq!(driver.last_error(), BusStatus::NACK);
		assert_eq!(driver.bus().bus_transactions().len(), 2);

		assert_eq!(driver.read_byte(absent, 0).unwrap(), 0);
		assert_eq!(driver.last_error(), BusStatus::NACK);
		assert_eq!(driver.bus().bus_transactions().len(), 4);

		driver.bus_mut().attach(absent);
		assert_eq!(driver.read_byte(absent, 0).unwrap(), 0xff);
		assert_eq!(driver.last_error(), BusStatus::OK);
	}

	#[test]
	fn latch_is_per_driver() {
		let mut checked = common::driver(common::checked());
		let mut other = common::driver(common::checked());

		checked.bus_mut().inject_faults(1);
		checked.read_byte(DEV, 0).unwrap();
		assert_eq!(checked.last_error(), BusStatus::NACK);

		assert_eq!(other.read_byte(DEV, 0).unwrap(), 0xff);
		assert_eq!(other.last_error(), BusStatus::OK);
	}

	#[test]
	fn start_switches_mode() {
		let mut driver = common::driver(DriverConfig::default());
		assert!(!driver.latch().check_enabled());
		driver.start(true);
		assert!(driver.config().check_errors);
		assert!(driver.latch().check_enabled());
	}
}

mod timing {
	use std::time::Duration;

	use crate::common::{
		self,
		DEV,
	};
	use cat24c512_eeprom::i2c::Transaction;
	use cat24c512_eeprom::{
		AddressSpace,
		BusStatus,
		DriverConfig,
	};
	use pretty_assertions::assert_eq;

	#[test]
	fn settle_and_guard_after_each_page_write() {
		let mut driver = common::driver(DriverConfig::default());
		driver.write_buffer(DEV, 120, &common::pattern(140, 0)).unwrap();

		// 7 chunks, 5ms write cycle + 5ms guard each
		assert_eq!(driver.bus().elapsed(), Duration::from_millis(70));
		assert_eq!(driver.last_error(), BusStatus::OK);
	}

	#[test]
	fn reads_do_not_wait() {
		let mut driver = common::driver(DriverConfig::default());
		driver.read_buffer(DEV, 0, 300).unwrap();
		assert_eq!(driver.bus().elapsed(), Duration::from_millis(0));
	}

	#[test]
	fn polling_waits_for_write_cycle() {
		let space = AddressSpace { settle_time_ms: 20, ..AddressSpace::CAT24C512 };
		let config = DriverConfig {
			poll_for_write_complete: true,
			..common::checked()
		};
		let mut driver = common::driver_with_space(space, config);
		let data = common::pattern(100, 5);

		driver.write_buffer(DEV, 0, &data).unwrap();
		assert_eq!(driver.read_buffer(DEV, 0, 100).unwrap(), data);
		assert_eq!(driver.last_error(), BusStatus::OK);

		let probes = driver.bus().transactions().iter().filter(|t| match t {
			Transaction::Send { bytes, .. } => bytes.is_empty(),
			_ => false,
		}).count();
		assert!(probes > 0);
	}

	#[test]
	fn polling_gives_up() {
		let space = AddressSpace { settle_time_ms: 1000, ..AddressSpace::CAT24C512 };
		let config = DriverConfig {
			poll_for_write_complete: true,
			max_poll_attempts: 3,
			..DriverConfig::default()
		};
		let mut driver = common::driver_with_space(space, config);

		assert!(driver.write_buffer(DEV, 0, &common::pattern(64, 0)).is_err());
		assert_eq!(driver.bus().data_writes(), 1);
	}
}
