use super::bits::{BitReader, BitWriter};
use super::error::*;
use super::{Node, Quadtree};

/// First header line of a QTC file.
pub const MAGIC: &[u8] = b"Q1";

const MEAN_BITS: u8 = 8;
const RESIDUAL_BITS: u8 = 2;
const UNIFORM_BITS: u8 = 1;

/// A packed tree: bytes plus the number of bits that carry data
/// (the rest of the last byte is zero padding).
#[derive(Clone, Debug, PartialEq)]
pub struct Bitstream {
	pub bytes: Vec<u8>,
	pub bits: usize,
}

/// A complete QTC file and the compression rate written in its header.
#[derive(Clone, Debug)]
pub struct Compressed {
	pub data: Vec<u8>,
	pub bits: usize,
	/// Encoded bits as a percentage of the raw 8-bit pixel bits.
	pub rate: f64,
}

impl Quadtree {
	/// Serializes the tree in index order, leaving out everything the
	/// decoder can work out for itself:
	///
	/// - children of a uniform node are not written at all;
	/// - fourth children never carry a mean, since
	///   `m4 = 4 * parent.mean + parent.residual - (m1 + m2 + m3)`;
	/// - leaves carry only their mean;
	/// - `uniform` is only written when the residual is 0.
	///
	/// Means are 8 bits, residuals 2 bits and the uniform flag 1 bit,
	/// all big-endian.
	pub fn encode(&self) -> Result<Bitstream, EncodeError> {
		let mut writer = BitWriter::new();
		for index in 0..self.len() {
			if self.parent_node(index).map_or(false, |p| p.uniform) {
				continue;
			}
			let leaf = self.is_leaf(index);
			let fourth = self.is_fourth_child(index);
			let node = self.node(index);
			if leaf {
				if !fourth {
					writer.write_bits(node.mean, MEAN_BITS);
				}
				continue;
			}
			if !fourth {
				writer.write_bits(node.mean, MEAN_BITS);
			}
			if node.residual > 3 {
				return Err(EncodeError::ResidualOutOfRange { node: index, residual: node.residual });
			}
			writer.write_bits(node.residual, RESIDUAL_BITS);
			if node.residual == 0 {
				writer.write_bits(node.uniform as u8, UNIFORM_BITS);
			}
		}
		let (bytes, bits) = writer.finish();
		tracing::debug!(bits, bytes = bytes.len(), "quadtree encoded");
		Ok(Bitstream { bytes, bits })
	}

	/// Rebuilds a tree of the given depth from a bitstream produced by
	/// `.encode()`, including every value the encoder left out.
	///
	/// Nodes are decoded in index order, so a node's parent and its
	/// earlier siblings are always complete by the time it is reached.
	///
	/// Successful return value also holds the number of bits consumed.
	pub fn decode(data: &[u8], depth: u8) -> Result<(Self, usize), DecodeError> {
		let mut tree = Quadtree::new(depth)?;
		let mut reader = BitReader::new(data);
		for index in 0..tree.len() {
			if let Some(parent) = tree.parent_node(index).copied() {
				if parent.uniform {
					*tree.node_mut(index) = Node { mean: parent.mean, uniform: true, ..Node::default() };
					continue;
				}
			}
			let mean = if tree.is_fourth_child(index) {
				tree.derive_fourth_mean(index)?
			} else {
				reader.read_bits(MEAN_BITS).ok_or(DecodeError::InsufficientData { node: index })?
			};
			if tree.is_leaf(index) {
				*tree.node_mut(index) = Node { mean, uniform: true, ..Node::default() };
				continue;
			}
			let residual = reader.read_bits(RESIDUAL_BITS)
				.ok_or(DecodeError::InsufficientData { node: index })?;
			// A non-zero residual means the children differ
			let uniform = residual == 0 && reader.read_bits(UNIFORM_BITS)
				.ok_or(DecodeError::InsufficientData { node: index })? == 1;
			*tree.node_mut(index) = Node { mean, uniform, residual, variance: 0. };
		}
		tracing::debug!(depth, bits = reader.position(), "quadtree decoded");
		Ok((tree, reader.position()))
	}

	/// Mean of a fourth child, from its parent and its three decoded
	/// siblings.
	fn derive_fourth_mean(&self, index: usize) -> Result<u8, DecodeError> {
		let parent = self.parent_node(index).ok_or(DecodeError::MissingParent { node: index })?;
		let siblings: i32 = self.nodes()[index - 3..index].iter().map(|n| i32::from(n.mean)).sum();
		let value = 4 * i32::from(parent.mean) + i32::from(parent.residual) - siblings;
		if value < 0 || value > 255 {
			return Err(DecodeError::InconsistentMean { node: index, value });
		}
		Ok(value as u8)
	}

	/// Encodes the tree into QTC file data, stamped with the current
	/// local time.
	///
	/// `original_bytes` is the size of the raw pixel data, used for the
	/// compression rate in the header.
	pub fn to_qtc(&self, original_bytes: usize) -> Result<Compressed, EncodeError> {
		let stamp = chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string();
		self.to_qtc_stamped(original_bytes, &stamp)
	}

	/// Like `.to_qtc()`, with an explicit timestamp line.
	pub fn to_qtc_stamped(&self, original_bytes: usize, stamp: &str) -> Result<Compressed, EncodeError> {
		let stream = self.encode()?;
		let rate = stream.bits as f64 * 100. / (original_bytes as f64 * 8.);
		let mut data = Vec::with_capacity(stream.bytes.len() + 64);
		data.extend_from_slice(MAGIC);
		data.extend_from_slice(format!("\n# {}\n# compression rate {:6.2}%\n", stamp, rate).as_bytes());
		data.push(self.depth());
		data.extend_from_slice(&stream.bytes);
		tracing::info!(bits = stream.bits, rate, "QTC data written");
		Ok(Compressed { data, bits: stream.bits, rate })
	}

	/// Parses QTC file data back into a tree.
	///
	/// The header must open with the `Q1` tag; the two comment lines
	/// after it are skipped.
	pub fn from_qtc(source: &[u8]) -> Result<Self, DecodeError> {
		let mut lines = source.splitn(4, |&b| b == b'\n');
		match lines.next() {
			Some(tag) if tag.strip_suffix(b"\r").unwrap_or(tag) == MAGIC => (),
			_ => return Err(DecodeError::MissingHeader),
		}
		for _ in 0..2 {
			lines.next().ok_or(DecodeError::MissingHeader)?;
		}
		let body = lines.next().ok_or(DecodeError::MissingDepth)?;
		let (&depth, bitstream) = body.split_first().ok_or(DecodeError::MissingDepth)?;
		let (tree, bits) = Quadtree::decode(bitstream, depth)?;
		tracing::info!(depth, bits, "QTC data read");
		Ok(tree)
	}
}
