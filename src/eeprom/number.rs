use std::fmt;
use std::str;

/// Fixed width number encodings stored in the EEPROM.
///
/// Values are passed around as `f64`, which represents every value of every
/// format exactly. Integers are encoded by truncating towards zero and
/// wrapping into the target width.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum NumberFormat {
	Int8LE,
	UInt8LE,
	Int16LE,
	UInt16LE,
	Int32LE,
	UInt32LE,
	Int8BE,
	UInt8BE,
	Int16BE,
	UInt16BE,
	Int32BE,
	UInt32BE,
	Float32LE,
	Float64LE,
	Float32BE,
	Float64BE,
}

use self::NumberFormat::*;

const ALL_FORMATS: [NumberFormat; 16] = [
	Int8LE, UInt8LE, Int16LE, UInt16LE, Int32LE, UInt32LE,
	Int8BE, UInt8BE, Int16BE, UInt16BE, Int32BE, UInt32BE,
	Float32LE, Float64LE, Float32BE, Float64BE,
];

impl NumberFormat {
	pub fn all() -> &'static [NumberFormat] {
		&ALL_FORMATS
	}

	pub fn size(&self) -> usize {
		match self {
			Int8LE | UInt8LE | Int8BE | UInt8BE => 1,
			Int16LE | UInt16LE | Int16BE | UInt16BE => 2,
			Int32LE | UInt32LE | Int32BE | UInt32BE | Float32LE | Float32BE => 4,
			Float64LE | Float64BE => 8,
		}
	}

	pub fn is_big_endian(&self) -> bool {
		match self {
			Int8BE | UInt8BE | Int16BE | UInt16BE | Int32BE | UInt32BE | Float32BE | Float64BE => true,
			_ => false,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Int8LE => "int8le",
			UInt8LE => "uint8le",
			Int16LE => "int16le",
			UInt16LE => "uint16le",
			Int32LE => "int32le",
			UInt32LE => "uint32le",
			Int8BE => "int8be",
			UInt8BE => "uint8be",
			Int16BE => "int16be",
			UInt16BE => "uint16be",
			Int32BE => "int32be",
			UInt32BE => "uint32be",
			Float32LE => "float32le",
			Float64LE => "float64le",
			Float32BE => "float32be",
			Float64BE => "float64be",
		}
	}

	/// Decode from the first `size()` bytes of `data`.
	pub fn decode(&self, data: &[u8]) -> crate::AResult<f64> {
		let size = self.size();
		ensure!(data.len() >= size, "need {} bytes to decode {}, got {}", size, self, data.len());

		// normalize to big endian
		let mut raw = [0u8; 8];
		raw[8 - size..].copy_from_slice(&data[..size]);
		if !self.is_big_endian() {
			raw[8 - size..].reverse();
		}
		let b1 = [raw[7]];
		let b2 = [raw[6], raw[7]];
		let b4 = [raw[4], raw[5], raw[6], raw[7]];

		Ok(match self {
			Int8LE | Int8BE => i8::from_be_bytes(b1) as f64,
			UInt8LE | UInt8BE => u8::from_be_bytes(b1) as f64,
			Int16LE | Int16BE => i16::from_be_bytes(b2) as f64,
			UInt16LE | UInt16BE => u16::from_be_bytes(b2) as f64,
			Int32LE | Int32BE => i32::from_be_bytes(b4) as f64,
			UInt32LE | UInt32BE => u32::from_be_bytes(b4) as f64,
			Float32LE | Float32BE => f32::from_be_bytes(b4) as f64,
			Float64LE | Float64BE => f64::from_be_bytes(raw),
		})
	}

	pub fn encode(&self, value: f64) -> Vec<u8> {
		// saturate into i64 first, then wrap into the target width
		let int = value as i64;
		let raw: [u8; 8] = match self {
			Int8LE | Int8BE | UInt8LE | UInt8BE => (int as u8 as u64).to_be_bytes(),
			Int16LE | Int16BE | UInt16LE | UInt16BE => (int as u16 as u64).to_be_bytes(),
			Int32LE | Int32BE | UInt32LE | UInt32BE => (int as u32 as u64).to_be_bytes(),
			Float32LE | Float32BE => ((value as f32).to_bits() as u64).to_be_bytes(),
			Float64LE | Float64BE => value.to_bits().to_be_bytes(),
		};

		let mut bytes = raw[8 - self.size()..].to_vec();
		if !self.is_big_endian() {
			bytes.reverse();
		}
		bytes
	}
}

impl fmt::Display for NumberFormat {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl str::FromStr for NumberFormat {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lower = s.to_ascii_lowercase();
		match ALL_FORMATS.iter().find(|f| f.name() == lower) {
			Some(f) => Ok(*f),
			None => bail!("unknown number format {:?} (expected one of int8le, uint16be, float32le, ...)", s),
		}
	}
}
