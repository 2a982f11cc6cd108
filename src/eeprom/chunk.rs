use std::ops::Range;

use super::AddressSpace;

/// Part of a transfer handled by one bus transaction; `offset` is relative
/// to the start address of the transfer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Chunk {
	pub offset: u32,
	pub length: u32,
}

impl Chunk {
	/// range of the chunk within the caller's buffer
	pub fn range(&self) -> Range<usize> {
		self.offset as usize..(self.offset + self.length) as usize
	}
}

/// Splits transfers into bus transactions.
///
/// Reads are only limited by the bus; writes additionally must not cross a
/// page line, as the device would wrap around to the start of the page.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ChunkPlanner {
	space: AddressSpace,
}

impl ChunkPlanner {
	pub fn new(space: AddressSpace) -> Self {
		ChunkPlanner { space }
	}

	pub fn address_space(&self) -> &AddressSpace {
		&self.space
	}

	pub fn plan_write(&self, start: u32, total_length: usize) -> crate::AResult<Vec<Chunk>> {
		let total_length = self.space.clamp_length(start, total_length);
		let max_write_size = self.space.max_write_size()?;
		let page_size = self.space.page_size;

		let mut chunks = Vec::new();
		let mut recorded = 0u32;
		while recorded < total_length {
			let mut amount = (total_length - recorded).min(max_write_size);

			if amount > 1 {
				// check for crossing of a page line
				let first = start + recorded;
				let last = first + amount - 1;
				if self.space.page_of(first) != self.space.page_of(last) {
					// go right up to the edge of the page
					amount = page_size - first % page_size;
				}
			}

			chunks.push(Chunk { offset: recorded, length: amount });
			recorded += amount;
		}

		Ok(chunks)
	}

	pub fn plan_read(&self, start: u32, total_length: usize) -> crate::AResult<Vec<Chunk>> {
		let total_length = self.space.clamp_length(start, total_length);
		let max_read_size = self.space.max_read_size()?;

		let mut chunks = Vec::new();
		let mut received = 0u32;
		while received < total_length {
			let amount = (total_length - received).min(max_read_size);
			chunks.push(Chunk { offset: received, length: amount });
			received += amount;
		}

		Ok(chunks)
	}
}
