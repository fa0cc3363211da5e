use bitvec::prelude::*;

/// A `BitVec` variant ideal for encoding and decoding quadtrees.
pub type QuadtreeEncodeBitVec = BitVec<u8, Msb0>;

/// Appends fixed-width fields MSB-first.
#[derive(Debug, Default)]
pub struct BitWriter {
	bits: QuadtreeEncodeBitVec,
}

impl BitWriter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Writes the low `width` bits of `value`, most significant first.
	pub fn write_bits(&mut self, value: u8, width: u8) {
		for bit_ind in 0..width {
			self.bits.push(value & (1 << (width - bit_ind - 1)) != 0);
		}
	}

	/// Zero-pads the stream to a whole byte and returns the bytes along
	/// with the number of bits that were actually written.
	pub fn finish(mut self) -> (Vec<u8>, usize) {
		let written = self.bits.len();
		while self.bits.len() % 8 != 0 {
			self.bits.push(false);
		}
		(self.bits.into_vec(), written)
	}
}

/// Reads fixed-width fields MSB-first from a byte slice.
#[derive(Debug)]
pub struct BitReader<'a> {
	bits: &'a BitSlice<u8, Msb0>,
	pos: usize,
}

impl<'a> BitReader<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self { bits: data.view_bits::<Msb0>(), pos: 0 }
	}

	/// Reads `width` bits as an unsigned value, or `None` if fewer than
	/// `width` bits remain.
	pub fn read_bits(&mut self, width: u8) -> Option<u8> {
		let end = self.pos + width as usize;
		if end > self.bits.len() {
			return None;
		}
		let value = self.bits[self.pos..end]
			.iter()
			.fold(0u8, |n, bit| (n << 1) | *bit as u8);
		self.pos = end;
		Some(value)
	}

	/// Number of bits consumed so far.
	pub fn position(&self) -> usize {
		self.pos
	}
}
