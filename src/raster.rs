//! Square 8-bit grayscale rasters and their file formats.
//!
//! Binary PGM (`P5`) goes through `image`'s PNM codec with its header
//! kept in hand, so the stored maximum intensity survives untouched;
//! every other format is converted to 8-bit luma.

use std::fs;
use std::path::Path;

use image::codecs::pnm::{GraymapHeader, PnmDecoder, PnmHeader, PnmSubtype, SampleEncoding};
use image::{ImageDecoder, ImageError};

use crate::node::error::RasterError;

/// A `size`x`size` grid of intensities in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
	size: usize,
	maxval: u8,
	pixels: Vec<u8>,
}

impl Raster {
	/// Wraps a pixel buffer, checking that it describes a square
	/// power-of-two image.
	pub fn new(size: usize, maxval: u8, pixels: Vec<u8>) -> Result<Self, RasterError> {
		if !size.is_power_of_two() {
			return Err(RasterError::NonPowerOfTwo(size));
		}
		if maxval == 0 {
			return Err(RasterError::InvalidMaxval(0));
		}
		match size.checked_mul(size) {
			Some(area) if area == pixels.len() => (),
			_ => return Err(RasterError::SizeMismatch { size, found: pixels.len() }),
		}
		Ok(Self { size, maxval, pixels })
	}

	/// A raster of one intensity everywhere, with maxval 255.
	pub fn filled(size: usize, value: u8) -> Self {
		Self { size, maxval: 255, pixels: vec![value; size * size] }
	}

	pub fn size(&self) -> usize {
		self.size
	}

	pub fn maxval(&self) -> u8 {
		self.maxval
	}

	/// `log2(size)`, the depth of the quadtree describing this raster.
	pub fn depth(&self) -> u8 {
		self.size.trailing_zeros() as u8
	}

	pub fn pixels(&self) -> &[u8] {
		&self.pixels
	}

	pub fn get(&self, x: usize, y: usize) -> u8 {
		self.pixels[y * self.size + x]
	}

	pub fn set(&mut self, x: usize, y: usize, value: u8) {
		self.pixels[y * self.size + x] = value;
	}

	/// Paints the `side`x`side` block whose top-left corner is `(x, y)`.
	pub fn fill_block(&mut self, x: usize, y: usize, side: usize, value: u8) {
		for row in y..y + side {
			let start = row * self.size + x;
			self.pixels[start..start + side].iter_mut().for_each(|p| *p = value);
		}
	}

	/// Iterates over the `side`x`side` block whose top-left corner is `(x, y)`.
	pub fn block(&self, x: usize, y: usize, side: usize) -> impl Iterator<Item = u8> + '_ {
		(y..y + side).flat_map(move |row| {
			let start = row * self.size + x;
			self.pixels[start..start + side].iter().copied()
		})
	}

	/// Parses a binary PGM file.
	///
	/// The header is checked for a square power-of-two side and a maxval
	/// in `1..=255` before any pixel is read.
	pub fn from_pgm(data: &[u8]) -> Result<Self, RasterError> {
		let (_, header) = PnmDecoder::new(data).map_err(malformed)?.into_inner();
		match header.subtype() {
			PnmSubtype::Graymap(SampleEncoding::Binary) => (),
			_ => return Err(RasterError::MalformedHeader("expected P5 magic number".into())),
		}
		let (width, height) = (header.width() as usize, header.height() as usize);
		if width != height {
			return Err(RasterError::NonSquare { width, height });
		}
		let maxval = header.maximal_sample();
		if maxval == 0 || maxval > 255 {
			return Err(RasterError::InvalidMaxval(maxval));
		}
		if !width.is_power_of_two() {
			return Err(RasterError::NonPowerOfTwo(width));
		}
		let expected = width.checked_mul(height).ok_or_else(|| {
			RasterError::MalformedHeader(format!("{}x{} does not fit in memory", width, height))
		})?;
		// Cheap bound before allocating the pixel buffer
		if data.len() < expected {
			return Err(RasterError::Truncated { expected, found: data.len() });
		}

		// `into_inner` drops whatever the decoder had buffered, so the
		// samples come from a fresh decoder.
		let decoder = PnmDecoder::new(data)?;
		let mut pixels = vec![0; expected];
		decoder.read_image(&mut pixels)?;
		Self::new(width, maxval as u8, pixels)
	}

	/// Serializes as binary PGM, keeping the raster's maxval.
	pub fn to_pgm(&self) -> Result<Vec<u8>, RasterError> {
		let side = self.size as u32;
		let header: PnmHeader = GraymapHeader {
			encoding: SampleEncoding::Binary,
			width: side,
			height: side,
			maxwhite: u32::from(self.maxval),
		}.into();
		// Written by hand after the header: image 0.23's `PnmEncoder` turns
		// down any chosen header with a maxval below 255.
		let mut ret = Vec::new();
		header.write(&mut ret)?;
		ret.extend_from_slice(&self.pixels);
		Ok(ret)
	}

	/// Reads a raster from disk, choosing the decoder from the extension.
	pub fn open<Q: AsRef<Path>>(path: Q) -> Result<Self, RasterError> {
		let path = path.as_ref();
		if is_pgm(path) {
			return Self::from_pgm(&fs::read(path)?);
		}
		let img = image::open(path)?.into_luma8();
		let (width, height) = (img.width() as usize, img.height() as usize);
		if width != height {
			return Err(RasterError::NonSquare { width, height });
		}
		Self::new(width, 255, img.into_raw())
	}

	/// Writes the raster to disk, choosing the encoder from the extension.
	pub fn save<Q: AsRef<Path>>(&self, path: Q) -> Result<(), RasterError> {
		let path = path.as_ref();
		if is_pgm(path) {
			fs::write(path, self.to_pgm()?)?;
			return Ok(());
		}
		let side = self.size as u32;
		let img = image::GrayImage::from_raw(side, side, self.pixels.clone())
			.ok_or(RasterError::SizeMismatch { size: self.size, found: self.pixels.len() })?;
		img.save(path)?;
		Ok(())
	}
}

fn is_pgm(path: &Path) -> bool {
	path.extension()
		.and_then(|e| e.to_str())
		.map(|e| e.eq_ignore_ascii_case("pgm"))
		.unwrap_or(false)
}

fn malformed(e: ImageError) -> RasterError {
	RasterError::MalformedHeader(e.to_string())
}
