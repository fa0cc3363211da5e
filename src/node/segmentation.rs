use super::{quadrants, Quadtree};
use crate::raster::Raster;

/// Background intensity of a segmentation grid.
pub const GRID_BACKGROUND: u8 = 255;
/// Intensity of the outline drawn around non-uniform blocks.
pub const GRID_LINE: u8 = 120;

impl Quadtree {
	/// Draws the outline of every non-uniform block on a white raster,
	/// showing where the tree had to keep subdividing.
	pub fn segmentation_grid(&self) -> Raster {
		let mut grid = Raster::filled(self.size(), GRID_BACKGROUND);
		self.outline_block(&mut grid, 0, (0, 0), self.size());
		grid
	}

	fn outline_block(&self, grid: &mut Raster, index: usize, pos: (usize, usize), size: usize) {
		let (x, y) = pos;
		if !self.node(index).uniform {
			for i in 0..size {
				grid.set(x + i, y, GRID_LINE);
				grid.set(x + i, y + size - 1, GRID_LINE);
				grid.set(x, y + i, GRID_LINE);
				grid.set(x + size - 1, y + i, GRID_LINE);
			}
		}
		if let Some(children) = self.children(index) {
			let corners = quadrants(x, y, size);
			for (child, corner) in children.zip(corners.iter()) {
				self.outline_block(grid, child, *corner, size / 2);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn uniform_tree_draws_nothing() {
		let tree = Quadtree::from_raster(&Raster::filled(8, 3)).unwrap();
		assert_eq!(tree.segmentation_grid(), Raster::filled(8, GRID_BACKGROUND));
	}

	#[test]
	fn busy_quadrant_is_outlined() {
		// 4x4, only the top-left 2x2 block varies
		let pixels = vec![
			0, 9, 5, 5,
			9, 0, 5, 5,
			5, 5, 5, 5,
			5, 5, 5, 5,
		];
		let tree = Quadtree::from_raster(&Raster::new(4, 255, pixels).unwrap()).unwrap();
		let grid = tree.segmentation_grid();
		// The root border covers the outer ring, the top-left block is a full 2x2 outline
		for (x, y) in &[(0, 0), (1, 0), (0, 1), (1, 1), (3, 0), (0, 3), (3, 3)] {
			assert_eq!(grid.get(*x, *y), GRID_LINE, "pixel ({}, {})", x, y);
		}
		assert_eq!(grid.get(2, 2), GRID_BACKGROUND);
		assert_eq!(grid.get(1, 2), GRID_BACKGROUND);
	}
}
