pub mod error;

use std::ops::Range;

use error::TreeError;

/// Statistics of one square block of the image.
///
/// `variance` is only meaningful on the encoding side; it is never
/// written to the bitstream, so decoded trees carry 0 everywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Node {
	/// Truncated average intensity of the block.
	pub mean: u8,
	/// Whether the whole subtree is a single intensity.
	pub uniform: bool,
	/// Remainder of the children's mean sum modulo 4; always 0 on leaves.
	pub residual: u8,
	pub variance: f64,
}

/// Complete quaternary tree stored as a flat array.
///
/// Node 0 is the root and the children of node `i` live at
/// `4i+1 ..= 4i+4`, in the quadrant order given by [`quadrants`].
/// Every pass over the tree goes through the index helpers below
/// rather than doing the arithmetic itself.
#[derive(Clone, Debug)]
pub struct Quadtree {
	nodes: Vec<Node>,
	depth: u8,
}

/// Number of nodes in a complete quadtree of the given depth,
/// `(4^(depth+1) - 1) / 3`, or `None` if it overflows `usize`.
pub fn node_count(depth: u8) -> Option<usize> {
	4usize.checked_pow(u32::from(depth) + 1).map(|n| (n - 1) / 3)
}

/// Top-left corners of the four sub-blocks of the block at `(x, y)`
/// with side `size`, in child order: top-left, top-right,
/// bottom-right, bottom-left.
pub fn quadrants(x: usize, y: usize, size: usize) -> [(usize, usize); 4] {
	let half = size / 2;
	[
		(x, y),
		(x + half, y),
		(x + half, y + half),
		(x, y + half),
	]
}

impl Quadtree {
	/// Allocates a tree of the given depth with every node zeroed.
	pub fn new(depth: u8) -> Result<Self, TreeError> {
		let total = node_count(depth).ok_or(TreeError::TooDeep { depth })?;
		let mut nodes = Vec::new();
		nodes.try_reserve_exact(total)
			.map_err(|_| TreeError::Allocation { nodes: total })?;
		nodes.resize(total, Node::default());
		tracing::debug!(depth, total, "allocated quadtree");
		Ok(Self { nodes, depth })
	}

	pub fn depth(&self) -> u8 {
		self.depth
	}

	/// Side length of the image the tree describes.
	pub fn size(&self) -> usize {
		1 << self.depth
	}

	/// Total number of nodes.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Always false; a tree has at least its root.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn node(&self, index: usize) -> &Node {
		&self.nodes[index]
	}

	pub fn node_mut(&mut self, index: usize) -> &mut Node {
		&mut self.nodes[index]
	}

	/// Index of the parent of `index`, `None` for the root.
	pub fn parent(&self, index: usize) -> Option<usize> {
		if index == 0 {
			None
		} else {
			Some((index - 1) / 4)
		}
	}

	/// The parent node itself, `None` for the root.
	pub fn parent_node(&self, index: usize) -> Option<&Node> {
		self.parent(index).map(|p| &self.nodes[p])
	}

	/// Index range of the four children of `index`, `None` for leaves.
	pub fn children(&self, index: usize) -> Option<Range<usize>> {
		if self.is_leaf(index) {
			None
		} else {
			let first = 4 * index + 1;
			Some(first..first + 4)
		}
	}

	pub fn is_leaf(&self, index: usize) -> bool {
		4 * index + 1 >= self.nodes.len()
	}

	/// Whether `index` is the last of its siblings (the bottom-left quadrant).
	pub fn is_fourth_child(&self, index: usize) -> bool {
		index != 0 && (index - 1) % 4 == 3
	}

	/// Index ranges of every level below `index`, nearest level first.
	///
	/// Descendants of one node at a given level are contiguous in the
	/// flat layout.
	pub fn descendant_levels(&self, index: usize) -> impl Iterator<Item = Range<usize>> {
		let len = self.nodes.len();
		std::iter::successors(Some(index..index + 1), move |level| {
			let next = 4 * level.start + 1..4 * level.end + 1;
			if next.start < len {
				Some(next)
			} else {
				None
			}
		}).skip(1)
	}

	/// Sum of the means of the four children of `index`.
	///
	/// Must only be called on internal nodes.
	pub(crate) fn children_mean_sum(&self, index: usize) -> u32 {
		let first = 4 * index + 1;
		self.nodes[first..first + 4].iter().map(|c| u32::from(c.mean)).sum()
	}
}

pub mod bits;
pub mod image;
pub mod qtc;
pub mod segmentation;
