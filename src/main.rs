use qtc_codec::error::{AnalyzeError, DecodeError, RasterError, TreeError};
use qtc_codec::{Quadtree, Raster};

use tracing_subscriber::EnvFilter;

use std::fs;

/// Helper function for `main`.
fn error_exit(msg: &str, code: i32) -> ! {
	eprintln!("{}", msg);
	std::process::exit(code)
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
	Encode,
	Decode,
}

/// Everything the command line configures.
#[derive(Debug)]
struct Options {
	mode: Mode,
	input: String,
	output: String,
	/// Lossy filtering decay; `None` keeps the encoding lossless.
	alpha: Option<f64>,
	grid: bool,
	verbose: bool,
}

fn raster_error_exit(e: RasterError) -> ! {
	let code = match e {
		RasterError::Io(_) => 3,
		RasterError::Image(image::ImageError::IoError(_)) => 3,
		RasterError::Image(image::ImageError::Limits(_)) => 5,
		_ => 4,
	};
	error_exit(&format!("Invalid image: {}", e), code)
}

fn tree_error_exit(e: TreeError) -> ! {
	error_exit(&format!("Resource limits exceeded: {}", e), 5)
}

/// `clap`-based CLI for working with QTC files.
///
/// May exit process with status code if there are errors:
///
/// 1: `clap` error
///
/// 2: invalid arguments
///
/// 3: file I/O issues
///
/// 4: invalid image or QTC data
///
/// 5: memory limits exceeded
///
/// 10: other, potentially unknown error
fn main() {
	let clap_matches = clap::App::new("qtc")
		.version("0.1.0")
		.author("vkcz")
		.about("Converts grayscale images to and from a quadtree-based compression format (QTC).")
		.arg_from_usage("-c, --encode 'Encode the input image (PGM, or PNG) into QTC'")
		.arg_from_usage("-u, --decode 'Decode the input QTC file into an image'")
		.arg_from_usage("-i, --input=<FILE> 'Path to input file'")
		.arg_from_usage("-o, --output=[FILE] 'Path to output file; defaults to out.qtc or out.pgm'")
		.arg_from_usage("-a, --alpha=[ALPHA] 'Lossy filtering decay factor (--encode only); disabled unless > 0'")
		.arg_from_usage("-g, --grid 'Also write the segmentation grid to OUTPUT_g.pgm'")
		.arg_from_usage("-v, --verbose 'Log each stage of the conversion'")
		.get_matches();

	let mode = match (clap_matches.is_present("encode"), clap_matches.is_present("decode")) {
		(true, true) => error_exit("Only one of -c/--encode and -u/--decode must be present", 2),
		(true, false) => Mode::Encode,
		(false, true) => Mode::Decode,
		(false, false) => error_exit("One of -c/--encode and -u/--decode must be present", 2),
	};
	let options = Options {
		mode,
		input: clap_matches.value_of("input").unwrap_or_default().to_string(),
		output: clap_matches.value_of("output")
			.unwrap_or(if mode == Mode::Encode { "out.qtc" } else { "out.pgm" })
			.to_string(),
		alpha: match clap_matches.value_of("alpha").map(str::parse::<f64>) {
			None => None,
			Some(Ok(a)) if a > 0. => Some(a),
			Some(Ok(_)) => None,
			Some(Err(_)) => error_exit("Non-numeric value for alpha", 2),
		},
		grid: clap_matches.is_present("grid"),
		verbose: clap_matches.is_present("verbose"),
	};

	let default_level = if options.verbose { "debug" } else { "warn" };
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| EnvFilter::new(default_level)))
		.with_writer(std::io::stderr)
		.init();
	tracing::debug!(?options, "starting");

	let tree = match options.mode {
		Mode::Encode => encode(&options),
		Mode::Decode => decode(&options),
	};

	if options.grid {
		let grid_path = format!("{}_g.pgm", options.output);
		match tree.segmentation_grid().save(&grid_path) {
			Ok(()) => eprintln!("Segmentation grid written to {}", grid_path),
			Err(_) => error_exit("Could not save segmentation grid", 3),
		}
	}
}

fn encode(options: &Options) -> Quadtree {
	let source = Raster::open(&options.input).unwrap_or_else(|e| raster_error_exit(e));
	tracing::info!(size = source.size(), maxval = source.maxval(), "image read");
	let mut tree = match Quadtree::from_raster(&source) {
		Ok(t) => t,
		Err(AnalyzeError::Tree(e)) => tree_error_exit(e),
		Err(e) => error_exit(&format!("Invalid image: {}", e), 4),
	};
	if let Some(alpha) = options.alpha {
		match tree.lossy_threshold() {
			Some(sigma) => {
				tree.filter(sigma, alpha);
			},
			None => tracing::warn!("image has no variance to filter; encoding losslessly"),
		}
	}
	// Encoding can only fail on residuals outside 0..=3, which the
	// builder and the filter never produce.
	let compressed = match tree.to_qtc(source.pixels().len()) {
		Ok(c) => c,
		Err(e) => error_exit(&format!("Could not encode quadtree: {}", e), 10),
	};
	match fs::write(&options.output, &compressed.data) {
		Ok(()) => (),
		Err(_) => error_exit("Could not write to output file", 3),
	}
	eprintln!("{} written, compression rate {:.2}%", options.output, compressed.rate);
	tree
}

fn decode(options: &Options) -> Quadtree {
	let source = match fs::read(&options.input) {
		Ok(d) => d,
		Err(_) => error_exit("File not found or could not be read", 3),
	};
	let tree = match Quadtree::from_qtc(&source) {
		Ok(t) => t,
		Err(DecodeError::Tree(e)) => tree_error_exit(e),
		Err(e) => error_exit(&format!("Invalid QTC data: {}", e), 4),
	};
	tree.to_raster().save(&options.output).unwrap_or_else(|e| raster_error_exit(e));
	eprintln!("{} written", options.output);
	tree
}
