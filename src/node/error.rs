use thiserror::Error;

/// Reason why a quadtree couldn't be allocated.
#[derive(Debug, Error)]
pub enum TreeError {
	/// The node count for this depth does not fit in memory addressing.
	#[error("quadtree depth {depth} is too large")]
	TooDeep { depth: u8 },
	/// The node buffer could not be reserved.
	#[error("could not allocate {nodes} quadtree nodes")]
	Allocation { nodes: usize },
}

/// Reason why a raster couldn't be read, written or accepted by the codec.
#[derive(Debug, Error)]
pub enum RasterError {
	#[error("file could not be read or written: {0}")]
	Io(#[from] std::io::Error),
	/// The PGM header is not `P5`, lacks dimensions or maxval, or
	/// describes more pixels than can be addressed.
	#[error("malformed PGM header: {0}")]
	MalformedHeader(String),
	/// The image's dimensions are not equal; the image is not a square.
	#[error("image must be square, got {width}x{height}")]
	NonSquare { width: usize, height: usize },
	/// The image's side is not a power of two.
	#[error("image side {0} is not a power of two")]
	NonPowerOfTwo(usize),
	#[error("maximum intensity {0} is outside 1..=255")]
	InvalidMaxval(u32),
	/// The whole input is shorter than the pixel data its header announces.
	#[error("header announces {expected} pixel bytes, but the input holds only {found} bytes")]
	Truncated { expected: usize, found: usize },
	/// The pixel buffer does not hold `size * size` bytes.
	#[error("pixel buffer of {found} bytes does not match a {size}x{size} raster")]
	SizeMismatch { size: usize, found: usize },
	#[error(transparent)]
	Image(#[from] image::ImageError),
}

/// Reason why a raster couldn't be turned into a quadtree.
#[derive(Debug, Error)]
pub enum AnalyzeError {
	/// The raster side is not `2^depth`.
	#[error("raster side {size} does not match depth {depth}")]
	DepthMismatch { size: usize, depth: u8 },
	#[error(transparent)]
	Tree(#[from] TreeError),
}

/// Reason why a quadtree couldn't be encoded.
#[derive(Debug, Error)]
pub enum EncodeError {
	/// A residual does not fit in its 2-bit field.
	#[error("node {node} has residual {residual}, which does not fit in 2 bits")]
	ResidualOutOfRange { node: usize, residual: u8 },
}

/// Reason why a quadtree encoding couldn't be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
	/// There was no valid QTC file header.
	#[error("missing or invalid QTC header")]
	MissingHeader,
	/// The header is not followed by the depth byte.
	#[error("missing tree depth byte")]
	MissingDepth,
	/// A field was expected but the bitstream ended.
	#[error("bitstream ended while decoding node {node}")]
	InsufficientData { node: usize },
	/// A fourth child was reached with no decoded parent.
	#[error("node {node} has no parent to derive its mean from")]
	MissingParent { node: usize },
	/// The mean derived from the parent's residual is not a valid intensity.
	#[error("derived mean {value} of node {node} is outside 0..=255")]
	InconsistentMean { node: usize, value: i32 },
	#[error(transparent)]
	Tree(#[from] TreeError),
}
