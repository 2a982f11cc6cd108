#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate cat24c512_eeprom;
use cat24c512_eeprom::*;

use std::fs;
use std::io::{
	self,
	Read,
	Write,
};
use std::process::exit;

use cat24c512_eeprom::i2c::{
	I2cDev,
	open_i2c_dev,
};

type Driver = EepromDriver<I2cDev>;

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

// decimal or 0x-prefixed hexadecimal
fn get_number(matches: &clap::ArgMatches, name: &str) -> AResult<u32> {
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	with_number_context(name, param, if param.starts_with("0x") || param.starts_with("0X") {
		u32::from_str_radix(&param[2..], 16)
	} else {
		param.parse::<u32>()
	})
}

fn with_number_context(name: &str, param: &str, r: Result<u32, std::num::ParseIntError>) -> AResult<u32> {
	r.map_err(|e| {
		let msg = format!("invalid number {:?} for {}: {}", param, name, e);
		failure::Error::from(e).context(msg).into()
	})
}

fn get_byte(matches: &clap::ArgMatches, name: &str) -> AResult<u8> {
	let value = get_number(matches, name)?;
	ensure!(value <= 0xff, "{} must be a byte value, got {}", name, value);
	Ok(value as u8)
}

fn get_fill(matches: &clap::ArgMatches) -> AResult<u8> {
	if matches.is_present("FILL") {
		get_byte(matches, "FILL")
	} else {
		Ok(0xff)
	}
}

fn io_context<T>(r: io::Result<T>, msg: String) -> AResult<T> {
	r.map_err(|e| {
		let msg = format!("{}: {}", msg, e);
		failure::Error::from(e).context(msg).into()
	})
}

fn read_input(path: &str) -> io::Result<Vec<u8>> {
	let mut data = Vec::new();
	if path == "-" {
		io::stdin().read_to_end(&mut data)?;
	} else {
		fs::File::open(path)?.read_to_end(&mut data)?;
	}
	Ok(data)
}

fn hexdump(start: u32, data: &[u8]) {
	for (i, line) in data.chunks(16).enumerate() {
		print!("{:04x} ", start as usize + i * 16);
		for (j, b) in line.iter().enumerate() {
			if 8 == j {
				print!(" ");
			}
			print!(" {:02x}", b);
		}
		println!("");
	}
}

fn run_command(driver: &mut Driver, device: DeviceAddress, matches: &clap::ArgMatches) -> AResult<()> {
	match matches.subcommand() {
		("read_byte", Some(sub_m)) => {
			let address = get_number(sub_m, "ADDRESS")?;
			println!("{}", driver.read_byte(device, address)?);
		},
		("read_number", Some(sub_m)) => {
			let address = get_number(sub_m, "ADDRESS")?;
			let format: NumberFormat = get_param(sub_m, "FORMAT")?;
			println!("{}", driver.read_number(device, address, format)?);
		},
		("read_string", Some(sub_m)) => {
			let address = get_number(sub_m, "ADDRESS")?;
			let length = get_number(sub_m, "LENGTH")?;
			println!("{}", driver.read_string(device, address, length as usize)?);
		},
		("read_array", Some(sub_m)) => {
			let address = get_number(sub_m, "ADDRESS")?;
			let length = get_number(sub_m, "LENGTH")?;
			println!("{:?}", driver.read_array(device, address, length as usize)?);
		},
		("dump", Some(sub_m)) => {
			let address = get_number(sub_m, "ADDRESS")?;
			let length = get_number(sub_m, "LENGTH")?;
			let data = driver.read_buffer(device, address, length as usize)?;
			if sub_m.is_present("binary") {
				io::stdout().write_all(&data)?;
			} else {
				hexdump(address, &data);
			}
		},
		("write_byte", Some(sub_m)) => {
			let address = get_number(sub_m, "ADDRESS")?;
			let value = get_byte(sub_m, "VALUE")?;
			if !driver.write_byte(device, address, value)? {
				info!("EEPROM {}: byte at 0x{:04x} already {}", device, address, value);
			}
		},
		("write_number", Some(sub_m)) => {
			let address = get_number(sub_m, "ADDRESS")?;
			let format: NumberFormat = get_param(sub_m, "FORMAT")?;
			let value: f64 = get_param(sub_m, "VALUE")?;
			if !driver.write_number(device, address, value, format)? {
				info!("EEPROM {}: {} at 0x{:04x} already {}", device, format, address, value);
			}
		},
		("write_string", Some(sub_m)) => {
			let address = get_number(sub_m, "ADDRESS")?;
			let text = sub_m.value_of("TEXT").unwrap_or("");
			let written = driver.write_string(device, address, text)?;
			info!("EEPROM {}: wrote {} bytes at 0x{:04x}", device, written, address);
		},
		("write_file", Some(sub_m)) => {
			let address = get_number(sub_m, "ADDRESS")?;
			let path = sub_m.value_of("FILE").unwrap_or("-");
			let data = io_context(read_input(path), format!("couldn't read {}", path))?;
			let written = driver.write_buffer(device, address, &data)?;
			if written < data.len() {
				warn!("EEPROM {}: only {} of {} bytes fit", device, written, data.len());
			}
			info!("EEPROM {}: wrote {} bytes at 0x{:04x}", device, written, address);
		},
		("erase_page", Some(sub_m)) => {
			let page = get_number(sub_m, "PAGE")?;
			let fill = get_fill(sub_m)?;
			let page_start = driver.address_space().page_address(page)?;
			driver.erase_page(device, page_start, fill)?;
			info!("EEPROM {}: erased page {} (0x{:04x}) with 0x{:02x}", device, page, page_start, fill);
		},
		("erase", Some(sub_m)) => {
			let fill = get_fill(sub_m)?;
			driver.erase_all(device, fill)?;
			info!("EEPROM {}: erased with 0x{:02x}", device, fill);
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}

	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg bus: -b --bus +takes_value "I2C adapter device (default /dev/i2c-1)")
		(@arg device: -d --device +takes_value "EEPROM bus address, 50..57 (default 50)")
		(@arg check: -c --check "stop all bus activity after the first I2C error")
		(@arg poll: -p --poll "poll the device for write completion instead of waiting")
		(@subcommand read_byte =>
			(about: "read a single byte")
			(@arg ADDRESS: +required "EEPROM address")
		)
		(@subcommand read_number =>
			(about: "read a number")
			(@arg ADDRESS: +required "EEPROM address")
			(@arg FORMAT: +required "number format (int8le, uint16be, float32le, ...)")
		)
		(@subcommand read_string =>
			(about: "read text")
			(@arg ADDRESS: +required "EEPROM address")
			(@arg LENGTH: +required "length in bytes")
		)
		(@subcommand read_array =>
			(about: "read up to 32 signed bytes")
			(@arg ADDRESS: +required "EEPROM address")
			(@arg LENGTH: +required "number of bytes")
		)
		(@subcommand dump =>
			(about: "dump memory as hex (or binary to stdout)")
			(@arg binary: --binary "write raw bytes to stdout")
			(@arg ADDRESS: +required "EEPROM address")
			(@arg LENGTH: +required "number of bytes")
		)
		(@subcommand write_byte =>
			(about: "write a single byte (if changed)")
			(@arg ADDRESS: +required "EEPROM address")
			(@arg VALUE: +required "byte value")
		)
		(@subcommand write_number =>
			(about: "write a number (if changed)")
			(@arg ADDRESS: +required "EEPROM address")
			(@arg FORMAT: +required "number format (int8le, uint16be, float32le, ...)")
			(@arg VALUE: +required +allow_hyphen_values "value")
		)
		(@subcommand write_string =>
			(about: "write text")
			(@arg ADDRESS: +required "EEPROM address")
			(@arg TEXT: +required "text to write")
		)
		(@subcommand write_file =>
			(about: "write file contents")
			(@arg ADDRESS: +required "EEPROM address")
			(@arg FILE: +required "file to write ('-' for stdin)")
		)
		(@subcommand erase_page =>
			(about: "fill one 128 byte page")
			(@arg PAGE: +required "page number (0..511)")
			(@arg FILL: "fill byte (default 0xff)")
		)
		(@subcommand erase =>
			(about: "fill the whole EEPROM")
			(@arg FILL: "fill byte (default 0xff)")
		)
	).get_matches();

	let bus_path = matches.value_of("bus").unwrap_or("/dev/i2c-1");
	let device: DeviceAddress = if matches.is_present("device") {
		get_param(&matches, "device")?
	} else {
		DeviceAddress::DEFAULT
	};

	let config = DriverConfig {
		check_errors: matches.is_present("check"),
		poll_for_write_complete: matches.is_present("poll"),
		..DriverConfig::default()
	};

	let bus = io_context(open_i2c_dev(bus_path), format!("couldn't open I2C adapter {}", bus_path))?;
	let mut driver = EepromDriver::new(bus, AddressSpace::CAT24C512, config)?;

	run_command(&mut driver, device, &matches)?;

	let status = driver.last_error();
	if status.is_err() {
		bail!("I2C error on device {} ({}): {}", device, driver.bus().path().display(), status);
	}

	Ok(())
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		// eprintln!("Backtrace: {:?}", e.backtrace());
		exit(1);
	}
}
