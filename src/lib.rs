pub mod node;
pub mod raster;

pub use node::*;
pub use raster::Raster;

impl node::Quadtree {
	/// Lossy pass: collapses subtrees whose variance is small enough into
	/// uniform blocks of their own mean.
	///
	/// The root is held to `sigma`; every level below is held to the
	/// threshold of its parent times `alpha`. A node can only collapse
	/// once all four of its children have. Collapsed subtrees are
	/// flattened to the collapsing node's mean.
	///
	/// Returns the number of nodes collapsed. `sigma <= 0` leaves the
	/// tree untouched.
	pub fn filter(&mut self, sigma: f64, alpha: f64) -> usize {
		if !(sigma > 0.) {
			return 0;
		}
		let mut collapsed = 0;
		self.filter_node(0, sigma, alpha, &mut collapsed);
		tracing::info!(sigma, alpha, collapsed, "quadtree filtered");
		collapsed
	}

	fn filter_node(&mut self, index: usize, sigma: f64, alpha: f64, collapsed: &mut usize) -> bool {
		let children = match self.children(index) {
			Some(c) if !self.node(index).uniform => c,
			_ => return true,
		};
		let succeeded = children
			.map(|c| self.filter_node(c, sigma * alpha, alpha, collapsed))
			.filter(|&ok| ok)
			.count();
		if succeeded < 4 || self.node(index).variance > sigma {
			return false;
		}

		let mean = self.node(index).mean;
		let node = self.node_mut(index);
		node.residual = 0;
		node.uniform = true;
		for level in self.descendant_levels(index) {
			for i in level {
				*self.node_mut(i) = node::Node { mean, uniform: true, ..Default::default() };
			}
		}
		*collapsed += 1;
		true
	}

	/// Average variance over internal nodes and maximum variance over all
	/// nodes, or `None` for a single-pixel tree.
	pub fn variance_stats(&self) -> Option<(f64, f64)> {
		let internal = (0..self.len()).filter(|&i| !self.is_leaf(i)).count();
		if internal == 0 {
			return None;
		}
		let (sum, max) = self.nodes().iter()
			.fold((0., 0f64), |(sum, max), n| (sum + n.variance, max.max(n.variance)));
		Some((sum / internal as f64, max))
	}

	/// Root threshold for `.filter()` derived from the tree itself:
	/// average internal variance over maximum variance.
	///
	/// `None` when there is nothing to filter (one pixel, or no variance
	/// anywhere).
	pub fn lossy_threshold(&self) -> Option<f64> {
		match self.variance_stats() {
			Some((avg, max)) if max > 0. => Some(avg / max),
			_ => None,
		}
	}
}
