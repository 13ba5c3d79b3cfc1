// ============================================================================
// SplatterBoard CLI - headless drawing and filtering via command-line arguments
// ============================================================================
//
// Usage examples:
//   splatterboard -i photo.png --op blur --op sharpen -o result.png
//   splatterboard -i shots/*.png --op invert --output-dir out/ --format xpm
//   splatterboard --new 320x240 --draw circle-filled:160,120:200,120 -o disc.bmp
//   splatterboard --new 64x64 --draw line:0,0:63,63 --emit-primitives line.json
//
// Operations run in the order given, then the draws are replayed as
// press / move / release in input coordinates (origin top-left).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;
use serde::Serialize;

use crate::canvas::Canvas;
use crate::components::colors::Rgb8;
use crate::components::tools::Tool;
use crate::io::SaveFormat;
use crate::ops::filters::ConvolutionKind;
use crate::ops::shapes::Primitive;
use crate::settings::CanvasSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// SplatterBoard headless canvas processor.
#[derive(Parser, Debug)]
#[command(
    name = "splatterboard",
    about = "SplatterBoard headless canvas processor",
    long_about = "Apply convolution kernels and tone adjustments to images, or draw\n\
                  shapes on a fresh canvas, without opening a window. Reads PNG, BMP\n\
                  and XPM; writes PNG, BMP and XPM.\n\n\
                  Example:\n  \
                  splatterboard -i photo.png --op sharpen -o result.png\n  \
                  splatterboard --new 200x200 --draw rectangle:20,20:180,180 -o box.png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.bmp").
    #[arg(short, long, num_args = 1.., conflicts_with = "new")]
    pub input: Vec<String>,

    /// Start from a blank canvas of the given size instead of an input file.
    #[arg(long, value_name = "WxH")]
    pub new: Option<Dimensions>,

    /// Output file path. Only valid for a single input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing. Files keep their stem and get
    /// the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, bmp, xpm. Inferred from --output when omitted,
    /// defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Resample the canvas before any operation.
    #[arg(long, value_name = "WxH")]
    pub resize: Option<Dimensions>,

    /// Canvas operation; repeat to chain. One of: clear, invert, fade,
    /// intensify, blur, sharpen, lap-of-gauss, edge-detect-x, edge-detect-y,
    /// sobel, laplacian, laplacian2.
    #[arg(long = "op", value_name = "OP")]
    pub ops: Vec<CanvasOp>,

    /// Drag a tool across the canvas: TOOL:X1,Y1:X2,Y2 in pixel coordinates
    /// with the origin at the top-left. Repeat to draw several shapes.
    #[arg(long = "draw", value_name = "TOOL:X1,Y1:X2,Y2")]
    pub draws: Vec<DrawSpec>,

    #[arg(long, value_name = "R,G,B")]
    pub pen_color: Option<Rgb8>,

    #[arg(long, value_name = "R,G,B")]
    pub fill_color: Option<Rgb8>,

    /// Color used by `--op clear` and blank canvases.
    #[arg(long, value_name = "R,G,B")]
    pub background_color: Option<Rgb8>,

    /// Brush size, 1-11.
    #[arg(long, value_name = "1-11")]
    pub brush_size: Option<u32>,

    /// Shading strength for lines and shapes, -255 to 255.
    #[arg(long, value_name = "DEGREE", allow_hyphen_values = true)]
    pub gradient_degree: Option<i32>,

    /// Midpoint for fade and intensify, 0-255.
    #[arg(long, value_name = "0-255")]
    pub fade_degree: Option<i32>,

    /// Settings file to start from instead of the user's saved settings.
    #[arg(long, value_name = "FILE.cfg")]
    pub settings: Option<PathBuf>,

    /// Write every committed draw command as JSON.
    #[arg(long, value_name = "FILE.json")]
    pub emit_primitives: Option<PathBuf>,

    /// Echo log lines to stderr and print per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

/// `WIDTHxHEIGHT`, both at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Dimensions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let (w, h) = lower
            .split_once('x')
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width: u32 = w.trim().parse().map_err(|_| format!("bad width in '{}'", s))?;
        let height: u32 = h.trim().parse().map_err(|_| format!("bad height in '{}'", s))?;
        if width == 0 || height == 0 {
            return Err(format!("dimensions must be non-zero, got '{}'", s));
        }
        Ok(Dimensions { width, height })
    }
}

/// Whole-canvas operations reachable from `--op`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanvasOp {
    Clear,
    Invert,
    Fade,
    Intensify,
    Convolve(ConvolutionKind),
}

impl CanvasOp {
    fn apply(&self, canvas: &mut Canvas) {
        match self {
            CanvasOp::Clear => canvas.clear(),
            CanvasOp::Invert => canvas.invert(),
            CanvasOp::Fade => canvas.fade(),
            CanvasOp::Intensify => canvas.intensify(),
            CanvasOp::Convolve(kind) => canvas.convolute(*kind),
        }
    }
}

impl FromStr for CanvasOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clear" => Ok(CanvasOp::Clear),
            "invert" => Ok(CanvasOp::Invert),
            // The tone passes, not the identity kernels sharing these names.
            "fade" => Ok(CanvasOp::Fade),
            "intensify" => Ok(CanvasOp::Intensify),
            _ => s
                .parse::<ConvolutionKind>()
                .map(CanvasOp::Convolve)
                .map_err(|_| format!("unknown operation '{}'", s)),
        }
    }
}

/// One `--draw` gesture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawSpec {
    pub tool: Tool,
    pub from: (f32, f32),
    pub to: (f32, f32),
}

impl DrawSpec {
    fn replay(&self, canvas: &mut Canvas) {
        canvas.activate_tool(self.tool);
        canvas.on_press(self.from.0, self.from.1);
        canvas.on_move(self.to.0, self.to.1);
        canvas.on_release();
    }
}

fn parse_xy(s: &str) -> Result<(f32, f32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{}'", s))?;
    let x: f32 = x.trim().parse().map_err(|_| format!("bad x in '{}'", s))?;
    let y: f32 = y.trim().parse().map_err(|_| format!("bad y in '{}'", s))?;
    if !x.is_finite() || !y.is_finite() {
        return Err(format!("coordinates must be finite, got '{}'", s));
    }
    Ok((x, y))
}

impl FromStr for DrawSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(format!("expected TOOL:X1,Y1:X2,Y2, got '{}'", s));
        }
        Ok(DrawSpec {
            tool: parts[0].parse()?,
            from: parse_xy(parts[1])?,
            to: parse_xy(parts[2])?,
        })
    }
}

/// Where a canvas comes from.
#[derive(Debug)]
enum Source {
    File(PathBuf),
    Blank(Dimensions),
}

impl Source {
    fn display(&self) -> String {
        match self {
            Source::File(p) => p.display().to_string(),
            Source::Blank(d) => format!("<new {}x{}>", d.width, d.height),
        }
    }
}

/// Draw commands committed while processing one source.
#[derive(Serialize)]
struct PrimitiveExport {
    source: String,
    primitives: Vec<Primitive>,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = setup failed or any file failed.
pub fn run(args: CliArgs) -> ExitCode {
    if args.verbose {
        crate::logger::set_echo(true);
    }
    match process_all(&args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Process every source. Returns the number of failed sources, or an
/// error when nothing could be attempted.
pub fn process_all(args: &CliArgs) -> Result<usize, String> {
    let sources: Vec<Source> = match args.new {
        Some(dims) => vec![Source::Blank(dims)],
        None => {
            if args.input.is_empty() {
                return Err("give --input files or --new WxH.".to_string());
            }
            resolve_inputs(&args.input).into_iter().map(Source::File).collect()
        }
    };
    if sources.is_empty() {
        return Err("no input files matched the given pattern(s).".to_string());
    }

    if sources.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        return Err(format!(
            "{} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            sources.len()
        ));
    }

    let save_format = parse_format(args.format.as_deref(), args.output.as_deref())?;
    let settings = resolve_settings(args)?;

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir).map_err(|e| {
            format!("could not create output directory '{}': {}", dir.display(), e)
        })?;
    }

    let total = sources.len();
    let multi = total > 1;
    let mut failures = 0;
    let mut exports = Vec::new();

    for (idx, source) in sources.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, source.display());
        }
        let file_start = Instant::now();

        let output_path = match build_output_path(
            source,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            save_format,
        ) {
            Some(p) => p,
            None => {
                eprintln!("  error: cannot determine output path for '{}'.", source.display());
                failures += 1;
                continue;
            }
        };

        match run_one(source, &output_path, &settings, args, save_format) {
            Ok(primitives) => {
                if args.verbose || multi {
                    println!(
                        "  -> {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
                exports.push(PrimitiveExport { source: source.display(), primitives });
            }
            Err(e) => {
                crate::log_err!("{}: {}", source.display(), e);
                eprintln!("  error: {}", e);
                failures += 1;
            }
        }
    }

    if let Some(path) = &args.emit_primitives {
        write_primitives(path, &exports)?;
    }

    Ok(failures)
}

// ============================================================================
// Per-source processing pipeline
// ============================================================================

fn run_one(
    source: &Source,
    output: &Path,
    settings: &CanvasSettings,
    args: &CliArgs,
    format: SaveFormat,
) -> Result<Vec<Primitive>, String> {
    // -- Step 1: Load ----------------------------------------------------
    let mut canvas = match source {
        Source::Blank(dims) => Canvas::from_settings(&CanvasSettings {
            width: dims.width,
            height: dims.height,
            ..settings.clone()
        }),
        Source::File(path) => {
            let mut canvas = Canvas::from_settings(settings);
            canvas.open(path).map_err(|e| format!("load failed: {}", e))?;
            canvas
        }
    };

    // -- Step 2: Resize, operations, draws -------------------------------
    if let Some(dims) = args.resize {
        canvas.resize(dims.width, dims.height);
    }
    for op in &args.ops {
        op.apply(&mut canvas);
    }
    for draw in &args.draws {
        draw.replay(&mut canvas);
    }

    // -- Step 3: Save ----------------------------------------------------
    canvas
        .save(output, format)
        .map_err(|e| format!("save failed: {}", e))?;

    Ok(canvas.take_committed())
}

// ============================================================================
// Helpers
// ============================================================================

/// Start from `--settings` (or the saved user settings) and apply the
/// style flags on top.
fn resolve_settings(args: &CliArgs) -> Result<CanvasSettings, String> {
    let mut s = match &args.settings {
        Some(path) => CanvasSettings::load_from(path)
            .map_err(|e| format!("could not read settings '{}': {}", path.display(), e))?,
        None => CanvasSettings::load(),
    };
    if let Some(c) = args.pen_color {
        s.pen_color = c;
    }
    if let Some(c) = args.fill_color {
        s.fill_color = c;
    }
    if let Some(c) = args.background_color {
        s.background_color = c;
    }
    if let Some(v) = args.brush_size {
        s.brush_size = v;
    }
    if let Some(v) = args.gradient_degree {
        s.gradient_degree = v;
    }
    if let Some(v) = args.fade_degree {
        s.fade_degree = v;
    }
    Ok(s)
}

fn write_primitives(path: &Path, exports: &[PrimitiveExport]) -> Result<(), String> {
    let json = serde_json::to_string_pretty(exports)
        .map_err(|e| format!("could not serialize primitives: {}", e))?;
    std::fs::write(path, json)
        .map_err(|e| format!("could not write '{}': {}", path.display(), e))?;
    crate::log_info!("Wrote primitives to {}", path.display());
    Ok(())
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is given.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<SaveFormat, String> {
    if let Some(f) = format_arg {
        return f.parse();
    }
    Ok(output.and_then(SaveFormat::from_path).unwrap_or_default())
}

/// Compute the output path for a single source.
///
/// Priority:
/// 1. `--output`
/// 2. `--output-dir` joined with the input stem (`untitled` for blank canvases)
/// 3. Next to the input, appending `_out` when it would overwrite the input
fn build_output_path(
    source: &Source,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let input = match source {
        Source::File(p) => p.as_path(),
        Source::Blank(_) => {
            let dir = output_dir.unwrap_or(Path::new("."));
            return Some(dir.join(format!("untitled.{}", ext)));
        }
    };
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("splatterboard-cli-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        dir
    }

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("splatterboard").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn dimensions_parse() {
        assert_eq!("640x480".parse(), Ok(Dimensions { width: 640, height: 480 }));
        assert_eq!(" 3X2 ".parse(), Ok(Dimensions { width: 3, height: 2 }));
        assert!("0x5".parse::<Dimensions>().is_err());
        assert!("640".parse::<Dimensions>().is_err());
    }

    #[test]
    fn ops_parse_tone_passes_and_kernels() {
        assert_eq!("fade".parse(), Ok(CanvasOp::Fade));
        assert_eq!("Invert".parse(), Ok(CanvasOp::Invert));
        assert_eq!("sobel".parse(), Ok(CanvasOp::Convolve(ConvolutionKind::Sobel)));
        assert_eq!(
            "lap-of-gauss".parse(),
            Ok(CanvasOp::Convolve(ConvolutionKind::LapOfGauss))
        );
        assert!("emboss".parse::<CanvasOp>().is_err());
    }

    #[test]
    fn draw_specs_parse() {
        let d: DrawSpec = "circle-filled:10,20:30.5,40".parse().expect("parses");
        assert_eq!(d.tool, Tool::CircleFilled);
        assert_eq!(d.from, (10.0, 20.0));
        assert_eq!(d.to, (30.5, 40.0));
        assert!("line:1,2".parse::<DrawSpec>().is_err());
        assert!("spray:1,2:3,4".parse::<DrawSpec>().is_err());
        assert!("line:1;2:3,4".parse::<DrawSpec>().is_err());
    }

    #[test]
    fn format_from_flag_or_extension() {
        assert_eq!(parse_format(Some("BMP"), None), Ok(SaveFormat::Bmp));
        assert!(parse_format(Some("gif"), None).is_err());
        assert_eq!(parse_format(None, Some(Path::new("x.xpm"))), Ok(SaveFormat::Xpm));
        assert_eq!(parse_format(None, Some(Path::new("x.unknown"))), Ok(SaveFormat::Png));
        assert_eq!(parse_format(None, None), Ok(SaveFormat::Png));
    }

    #[test]
    fn output_paths() {
        let src = Source::File(PathBuf::from("shots/a.png"));
        assert_eq!(
            build_output_path(&src, None, Some(Path::new("out")), SaveFormat::Bmp),
            Some(PathBuf::from("out/a.bmp"))
        );
        assert_eq!(
            build_output_path(&src, None, None, SaveFormat::Png),
            Some(PathBuf::from("shots/a_out.png"))
        );
        assert_eq!(
            build_output_path(&Source::Blank(Dimensions { width: 1, height: 1 }), None, None, SaveFormat::Xpm),
            Some(PathBuf::from("./untitled.xpm"))
        );
    }

    #[test]
    fn input_and_new_conflict() {
        let r = CliArgs::try_parse_from(["splatterboard", "-i", "a.png", "--new", "4x4"]);
        assert!(r.is_err());
    }

    #[test]
    fn negative_gradient_flag_parses() {
        let args = parse(&["--new", "4x4", "--gradient-degree", "-40"]);
        assert_eq!(args.gradient_degree, Some(-40));
    }

    #[test]
    fn blank_canvas_with_draws_and_export() {
        let dir = temp_dir("draw");
        let out = dir.join("shape.png");
        let json = dir.join("shape.json");
        let cfg = dir.join("empty.cfg");
        std::fs::write(&cfg, "").expect("cfg");
        let args = parse(&[
            "--new", "40x30",
            "--settings", cfg.to_str().expect("utf8"),
            "--background-color", "0,0,0",
            "--op", "clear",
            "--draw", "rectangle-filled:5,5:35,25",
            "--draw", "line:0,0:39,29",
            "-o", out.to_str().expect("utf8"),
            "--emit-primitives", json.to_str().expect("utf8"),
        ]);
        assert_eq!(process_all(&args), Ok(0));

        let img = crate::io::load_image(&out).expect("output decodes");
        assert_eq!(img.dimensions(), (40, 30));
        assert_ne!(img.get_pixel(20, 15).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 28).0, [0, 0, 0, 255]);

        let text = std::fs::read_to_string(&json).expect("json");
        let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        let prims = value[0]["primitives"].as_array().expect("array");
        assert_eq!(prims.len(), 2);
        assert_eq!(prims[0]["tool"], "rectangle_filled");
        assert_eq!(prims[1]["tool"], "line");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn batch_over_files_counts_failures() {
        let dir = temp_dir("batch");
        let good = dir.join("good.png");
        let bad = dir.join("bad.png");
        let img = image::RgbaImage::from_pixel(5, 5, image::Rgba([10, 20, 30, 255]));
        crate::io::encode_and_write(&img, &good, SaveFormat::Png).expect("write");
        std::fs::write(&bad, b"not a png").expect("write");
        let cfg = dir.join("empty.cfg");
        std::fs::write(&cfg, "").expect("cfg");

        let out_dir = dir.join("out");
        let args = parse(&[
            "-i", good.to_str().expect("utf8"), bad.to_str().expect("utf8"),
            "--settings", cfg.to_str().expect("utf8"),
            "--op", "invert",
            "--output-dir", out_dir.to_str().expect("utf8"),
            "-f", "xpm",
        ]);
        assert_eq!(process_all(&args), Ok(1));
        let back = crate::io::load_image(&out_dir.join("good.xpm")).expect("decode");
        assert_eq!(back.get_pixel(2, 2).0, [245, 235, 225, 255]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_source_is_a_setup_error() {
        let args = parse(&["-o", "x.png"]);
        assert!(process_all(&args).is_err());
    }
}
