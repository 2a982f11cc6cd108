/// Transport side of the 24XX EEPROM protocol.
///
/// The EEPROM sits on an I2C bus and only ever sees two kinds of
/// transactions:
///
/// - WRITE: 2-byte address (big endian), optionally followed by payload
///   bytes. Without payload this only loads the internal address pointer.
///   With payload the device starts a page write cycle after STOP and
///   NACKs everything until the cycle is finished.
/// - READ: N bytes starting at the internal address pointer, which is
///   incremented after each byte (wrapping at the end of the memory).
///
/// A "random read" is a WRITE without payload followed by a READ,
/// preferably joined by a repeated START (`keep_bus_active`).
///
/// Payload bytes of one WRITE wrap around inside the addressed page; callers
/// must never send data crossing a page boundary.

mod hardware;
mod linux;
mod simulated;

pub use self::hardware::{
	BusStatus,
	BusTransport,
	reliable_sleep,
};

pub use self::linux::{
	I2cDev,
	open_i2c_dev,
};

pub use self::simulated::{
	SimulatedEeprom,
	Transaction,
};
