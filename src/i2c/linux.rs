use std::fs;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{
	Path,
	PathBuf,
};

use crate::eeprom::DeviceAddress;

use super::{
	BusStatus,
	BusTransport,
};

/* from linux/i2c-dev.h and linux/i2c.h */
const I2C_RDWR: u32 = 0x0707;
const I2C_M_RD: u16 = 0x0001;

#[repr(C)]
struct I2cMsg {
	addr: u16,
	flags: u16,
	len: u16,
	buf: *mut u8,
}

#[repr(C)]
struct I2cRdwrIoctlData {
	msgs: *mut I2cMsg,
	nmsgs: u32,
}

/// An I2C adapter exposed through `/dev/i2c-N` (needs the `i2c-dev` module).
#[derive(Debug)]
pub struct I2cDev {
	file: fs::File,
	path: PathBuf,
	// address write waiting for the following read (repeated START)
	pending: Option<(DeviceAddress, Vec<u8>)>,
}

impl I2cDev {
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn transfer(&mut self, msgs: &mut [I2cMsg]) -> BusStatus {
		let mut data = I2cRdwrIoctlData {
			msgs: msgs.as_mut_ptr(),
			nmsgs: msgs.len() as u32,
		};
		let res = unsafe {
			libc::ioctl(
				self.file.as_raw_fd(),
				I2C_RDWR as _,
				&mut data as *mut I2cRdwrIoctlData,
			)
		};
		if res < 0 {
			let e = io::Error::last_os_error();
			trace!("{}: I2C_RDWR failed: {}", self.path.display(), e);
			BusStatus::from_errno(e.raw_os_error().unwrap_or(libc::EIO))
		} else {
			BusStatus::OK
		}
	}

	fn write_message(&mut self, device: DeviceAddress, bytes: &[u8]) -> BusStatus {
		if bytes.len() > u16::max_value() as usize {
			return BusStatus::INVALID;
		}
		// the kernel doesn't modify buffers of write messages
		let mut msgs = [I2cMsg {
			addr: device.value() as u16,
			flags: 0,
			len: bytes.len() as u16,
			buf: bytes.as_ptr() as *mut u8,
		}];
		self.transfer(&mut msgs)
	}

	fn flush_pending(&mut self) -> BusStatus {
		match self.pending.take() {
			None => BusStatus::OK,
			Some((device, bytes)) => self.write_message(device, &bytes),
		}
	}
}

impl BusTransport for I2cDev {
	fn send(&mut self, device: DeviceAddress, bytes: &[u8], keep_bus_active: bool) -> BusStatus {
		let status = self.flush_pending();
		if status.is_err() {
			return status;
		}

		if keep_bus_active && !bytes.is_empty() {
			// joined with the next `receive`; errors show up there
			self.pending = Some((device, bytes.to_vec()));
			return BusStatus::OK;
		}

		self.write_message(device, bytes)
	}

	// `keep_bus_active` isn't supported after a read: there is nothing to
	// join it with, so the bus is always released.
	fn receive(&mut self, device: DeviceAddress, length: usize, _keep_bus_active: bool) -> Result<Vec<u8>, BusStatus> {
		if length > u16::max_value() as usize {
			return Err(BusStatus::INVALID);
		}
		let mut data = vec![0u8; length];
		let read = I2cMsg {
			addr: device.value() as u16,
			flags: I2C_M_RD,
			len: length as u16,
			buf: data.as_mut_ptr(),
		};

		let status = match self.pending.take() {
			Some((pending_device, mut address)) if pending_device == device && address.len() <= u16::max_value() as usize => {
				let mut msgs = [
					I2cMsg {
						addr: device.value() as u16,
						flags: 0,
						len: address.len() as u16,
						buf: address.as_mut_ptr(),
					},
					read,
				];
				self.transfer(&mut msgs)
			},
			other => {
				self.pending = other;
				let status = self.flush_pending();
				if status.is_err() {
					return Err(status);
				}
				let mut msgs = [read];
				self.transfer(&mut msgs)
			},
		};

		if status.is_ok() {
			Ok(data)
		} else {
			Err(status)
		}
	}
}

pub fn open_i2c_dev<P: AsRef<Path>>(path: P) -> io::Result<I2cDev> {
	let path = path.as_ref().to_path_buf();
	let file = fs::OpenOptions::new()
		.read(true)
		.write(true)
		.open(&path)?;

	Ok(I2cDev {
		file,
		path,
		pending: None,
	})
}
