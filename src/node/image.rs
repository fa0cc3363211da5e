use super::error::AnalyzeError;
use super::{quadrants, Quadtree};
use crate::raster::Raster;

impl Quadtree {
	/// Analyzes a raster into a fully populated quadtree whose depth is
	/// `log2` of the raster side.
	pub fn from_raster(raster: &Raster) -> Result<Self, AnalyzeError> {
		let mut tree = Quadtree::new(raster.depth())?;
		tree.mount(raster)?;
		Ok(tree)
	}

	/// Fills every node of an allocated tree from a raster of matching
	/// size.
	///
	/// Children are summarized before their parent, so each internal
	/// node derives its mean, residual, uniformity and variance from
	/// the four finished children.
	pub fn mount(&mut self, raster: &Raster) -> Result<(), AnalyzeError> {
		if raster.size() != self.size() {
			return Err(AnalyzeError::DepthMismatch { size: raster.size(), depth: self.depth() });
		}
		self.mount_block(raster, 0, (0, 0), raster.size());
		tracing::debug!(
			root_mean = self.node(0).mean,
			root_variance = self.node(0).variance,
			"quadtree built"
		);
		Ok(())
	}

	fn mount_block(&mut self, raster: &Raster, index: usize, pos: (usize, usize), size: usize) {
		let children = match self.children(index) {
			Some(c) => c,
			None => {
				let first = raster.get(pos.0, pos.1);
				let (sum, uniform) = raster.block(pos.0, pos.1, size)
					.fold((0u64, true), |(sum, uniform), p| (sum + u64::from(p), uniform && p == first));
				let node = self.node_mut(index);
				node.mean = (sum / (size * size) as u64) as u8;
				node.uniform = uniform;
				node.residual = 0;
				node.variance = 0.;
				return;
			}
		};

		let corners = quadrants(pos.0, pos.1, size);
		for (child, corner) in children.clone().zip(corners.iter()) {
			self.mount_block(raster, child, *corner, size / 2);
		}

		let sum = self.children_mean_sum(index);
		let first_mean = self.node(children.start).mean;
		let uniform = children.clone()
			.all(|c| self.node(c).uniform && self.node(c).mean == first_mean);
		let node = self.node_mut(index);
		node.mean = (sum / 4) as u8;
		node.residual = (sum % 4) as u8;
		node.uniform = uniform;
		self.update_variance(index);
	}

	/// `sqrt(sum(var(c)^2 + (mean - mean(c))^2)) / 4` over the children.
	fn update_variance(&mut self, index: usize) {
		let children = match self.children(index) {
			Some(c) => c,
			None => {
				self.node_mut(index).variance = 0.;
				return;
			}
		};
		let mean = f64::from(self.node(index).mean);
		let acc = children
			.map(|c| {
				let child = self.node(c);
				let diff = mean - f64::from(child.mean);
				child.variance * child.variance + diff * diff
			})
			.sum::<f64>();
		self.node_mut(index).variance = acc.sqrt() / 4.;
	}

	/// Renders the tree back into a raster.
	///
	/// A uniform node paints its whole block with its own mean, so a
	/// filtered tree renders the same way it will after a round trip
	/// through the bitstream.
	pub fn to_raster(&self) -> Raster {
		let mut raster = Raster::filled(self.size(), 0);
		self.draw_block(&mut raster, 0, (0, 0), self.size());
		raster
	}

	fn draw_block(&self, raster: &mut Raster, index: usize, pos: (usize, usize), size: usize) {
		let node = self.node(index);
		match self.children(index) {
			Some(children) if !node.uniform => {
				let corners = quadrants(pos.0, pos.1, size);
				for (child, corner) in children.zip(corners.iter()) {
					self.draw_block(raster, child, *corner, size / 2);
				}
			},
			_ => raster.fill_block(pos.0, pos.1, size, node.mean),
		}
	}
}
