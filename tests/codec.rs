use proptest::prelude::*;

use qtc_codec::{quadrants, Quadtree, Raster};

/// Square rasters of side 1 to 16 with arbitrary pixels.
fn any_raster() -> impl Strategy<Value = Raster> {
	(0u8..=4).prop_flat_map(|depth| {
		let size = 1usize << depth;
		proptest::collection::vec(any::<u8>(), size * size)
			.prop_map(move |pixels| Raster::new(size, 255, pixels).unwrap())
	})
}

/// Rasters drawn from a few close intensities, so uniform and
/// near-uniform blocks are common.
fn blocky_raster() -> impl Strategy<Value = Raster> {
	(1u8..=4).prop_flat_map(|depth| {
		let size = 1usize << depth;
		proptest::collection::vec(prop::sample::select(vec![60u8, 61, 64]), size * size)
			.prop_map(move |pixels| Raster::new(size, 255, pixels).unwrap())
	})
}

fn round_trip(tree: &Quadtree) -> (Quadtree, usize, usize) {
	let stream = tree.encode().unwrap();
	let (decoded, consumed) = Quadtree::decode(&stream.bytes, tree.depth()).unwrap();
	(decoded, stream.bits, consumed)
}

/// Checks that every uniform node covers a single intensity of `raster`.
fn assert_uniform_blocks(tree: &Quadtree, raster: &Raster, index: usize, pos: (usize, usize), size: usize) {
	if tree.node(index).uniform {
		let first = raster.get(pos.0, pos.1);
		assert!(raster.block(pos.0, pos.1, size).all(|p| p == first), "node {} is not flat", index);
	}
	if let Some(children) = tree.children(index) {
		for (child, corner) in children.zip(quadrants(pos.0, pos.1, size).iter()) {
			assert_uniform_blocks(tree, raster, child, *corner, size / 2);
		}
	}
}

fn uniform_count(tree: &Quadtree) -> usize {
	tree.nodes().iter().filter(|n| n.uniform).count()
}

proptest! {
	#[test]
	fn lossless_round_trip(raster in any_raster()) {
		let tree = Quadtree::from_raster(&raster).unwrap();
		let (decoded, written, consumed) = round_trip(&tree);
		prop_assert_eq!(written, consumed);
		prop_assert_eq!(decoded.to_raster(), raster);
	}

	#[test]
	fn blocky_round_trip_restores_every_node(raster in blocky_raster()) {
		let tree = Quadtree::from_raster(&raster).unwrap();
		let (decoded, written, consumed) = round_trip(&tree);
		prop_assert_eq!(written, consumed);
		for (a, b) in tree.nodes().iter().zip(decoded.nodes()) {
			prop_assert_eq!(a.mean, b.mean);
			prop_assert_eq!(a.residual, b.residual);
			prop_assert_eq!(a.uniform, b.uniform);
		}
	}

	#[test]
	fn uniform_nodes_cover_flat_blocks(raster in blocky_raster()) {
		let tree = Quadtree::from_raster(&raster).unwrap();
		assert_uniform_blocks(&tree, &raster, 0, (0, 0), raster.size());
	}

	#[test]
	fn any_child_mean_is_recoverable(raster in any_raster()) {
		let tree = Quadtree::from_raster(&raster).unwrap();
		for index in 0..tree.len() {
			let children = match tree.children(index) {
				Some(c) => c.collect::<Vec<_>>(),
				None => continue,
			};
			let node = tree.node(index);
			let total = 4 * i32::from(node.mean) + i32::from(node.residual);
			for &missing in &children {
				let others: i32 = children.iter()
					.filter(|&&c| c != missing)
					.map(|&c| i32::from(tree.node(c).mean))
					.sum();
				prop_assert_eq!(total - others, i32::from(tree.node(missing).mean));
			}
		}
	}

	#[test]
	fn filtering_is_monotonic_in_alpha(raster in blocky_raster(), low in 0.5f64..2., step in 0f64..2.) {
		let base = Quadtree::from_raster(&raster).unwrap();
		let sigma = match base.lossy_threshold() {
			Some(s) => s,
			None => return Ok(()),
		};
		let mut loose = base.clone();
		let mut tight = base.clone();
		tight.filter(sigma, low);
		loose.filter(sigma, low + step);
		prop_assert!(uniform_count(&tight) <= uniform_count(&loose));
		for ((t, l), b) in tight.nodes().iter().zip(loose.nodes()).zip(base.nodes()) {
			prop_assert!(t.variance <= b.variance);
			prop_assert!(l.variance <= b.variance);
		}
	}

	#[test]
	fn filtered_tree_survives_the_bitstream(raster in blocky_raster(), alpha in 0.5f64..4.) {
		let mut tree = Quadtree::from_raster(&raster).unwrap();
		if let Some(sigma) = tree.lossy_threshold() {
			tree.filter(sigma, alpha);
		}
		let (decoded, written, consumed) = round_trip(&tree);
		prop_assert_eq!(written, consumed);
		let rendered = tree.to_raster();
		prop_assert_eq!(decoded.to_raster(), rendered.clone());
		assert_uniform_blocks(&tree, &rendered, 0, (0, 0), rendered.size());
	}
}

#[test]
fn flat_four_by_four() {
	let tree = Quadtree::from_raster(&Raster::filled(4, 100)).unwrap();
	let stream = tree.encode().unwrap();
	// Only the root is written: its mean, a zero residual and the uniform flag
	assert_eq!(stream.bits, 8 + 2 + 1);
	assert_eq!(stream.bytes[0], 100);
	let (decoded, consumed) = Quadtree::decode(&stream.bytes, 2).unwrap();
	assert_eq!(consumed, 11);
	assert_eq!(decoded.to_raster(), Raster::filled(4, 100));
}

#[test]
fn one_pixel_image() {
	let raster = Raster::new(1, 255, vec![201]).unwrap();
	let tree = Quadtree::from_raster(&raster).unwrap();
	let stream = tree.encode().unwrap();
	assert_eq!(stream.bits, 8);
	assert_eq!(stream.bytes, vec![201]);
	let (decoded, _) = Quadtree::decode(&stream.bytes, 0).unwrap();
	assert_eq!(decoded.node(0).residual, 0);
	assert_eq!(decoded.to_raster(), raster);
}

#[test]
fn one_detailed_quadrant() {
	// 8x8 of 30 whose bottom-right quadrant holds a gradient
	let mut pixels = vec![30u8; 64];
	for y in 4..8 {
		for x in 4..8 {
			pixels[y * 8 + x] = (x * 10 + y) as u8;
		}
	}
	let raster = Raster::new(8, 255, pixels).unwrap();
	let tree = Quadtree::from_raster(&raster).unwrap();
	// Only the bottom-right branch (node 3) is refined below the first level
	for index in 1..5 {
		assert_eq!(tree.node(index).uniform, index != 3);
	}
	let stream = tree.encode().unwrap();
	let (decoded, consumed) = Quadtree::decode(&stream.bytes, 3).unwrap();
	assert_eq!(consumed, stream.bits);
	assert_eq!(decoded.to_raster(), raster);

	// Same image with a flat bottom-right quadrant is strictly cheaper
	let flat = Quadtree::from_raster(&Raster::filled(8, 30)).unwrap();
	assert!(flat.encode().unwrap().bits < stream.bits);
}

#[test]
fn files_round_trip_on_disk() {
	let dir = std::env::temp_dir().join(format!("qtc_codec_test_{}", std::process::id()));
	std::fs::create_dir_all(&dir).unwrap();

	// 16x16 made of flat 4x4 tiles
	let pixels = (0..256u32).map(|i| ((i / 64) * 40 + ((i % 16) / 4) * 10) as u8).collect::<Vec<_>>();
	let source = Raster::new(16, 255, pixels).unwrap();
	let pgm_path = dir.join("source.pgm");
	source.save(&pgm_path).unwrap();
	let reread = Raster::open(&pgm_path).unwrap();
	assert_eq!(reread, source);

	let tree = Quadtree::from_raster(&reread).unwrap();
	let compressed = tree.to_qtc(reread.pixels().len()).unwrap();
	let qtc_path = dir.join("source.qtc");
	std::fs::write(&qtc_path, &compressed.data).unwrap();
	assert!(compressed.rate > 0. && compressed.rate < 100.);

	let decoded = Quadtree::from_qtc(&std::fs::read(&qtc_path).unwrap()).unwrap();
	let out_path = dir.join("decoded.pgm");
	decoded.to_raster().save(&out_path).unwrap();
	assert_eq!(Raster::open(&out_path).unwrap(), source);

	std::fs::remove_dir_all(&dir).unwrap();
}
