use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use gifsheet::{BackgroundSpec, Document, ExportFormat, SheetConfig, TileSize, plan};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "gifsheet", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the grid layout chosen for a frame count.
    Plan(PlanArgs),
    /// Compose a GIF into a sprite sheet image.
    Sheet(SheetArgs),
    /// Write the effect-processed, resized animation as a GIF.
    Gif(GifArgs),
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Number of frames.
    #[arg(long)]
    frames: usize,

    /// Keep single-row layouts for odd frame counts.
    #[arg(long)]
    allow_single_row: bool,
}

#[derive(Parser, Debug)]
struct SheetArgs {
    /// Input GIF.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output image, or a directory to use the texture naming convention.
    #[arg(long)]
    out: PathBuf,

    /// Still image appended after the GIF frames. Repeatable.
    #[arg(long = "add-image")]
    add_image: Vec<PathBuf>,

    /// JSON job configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output width in pixels.
    #[arg(long, requires = "height", conflicts_with = "auto")]
    width: Option<u32>,

    /// Output height in pixels.
    #[arg(long, requires = "width", conflicts_with = "auto")]
    height: Option<u32>,

    /// Keep tiles at the frames' native size.
    #[arg(long)]
    auto: bool,

    /// Background colour, `#RRGGBB` or `#RRGGBBAA`. Invalid values mean transparent.
    #[arg(long)]
    bg: Option<String>,

    /// Crop the sheet to whole tiles.
    #[arg(long)]
    borderless: bool,

    #[arg(long, value_enum)]
    format: Option<FormatChoice>,

    #[arg(long)]
    tile_grayscale: bool,

    /// Sharpen amount, 0..=10.
    #[arg(long)]
    tile_sharpen: Option<f32>,

    /// Blur radius in pixels, 0..=10.
    #[arg(long)]
    tile_blur: Option<f32>,

    /// Alpha factor, 0..=1.
    #[arg(long)]
    tile_transparency: Option<f32>,

    /// Colour intensity, 0..=1 (0.5 is neutral).
    #[arg(long)]
    tile_intensity: Option<f32>,

    /// Keep single-row layouts for odd frame counts.
    #[arg(long)]
    allow_single_row: bool,
}

#[derive(Parser, Debug)]
struct GifArgs {
    /// Input GIF.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output GIF path.
    #[arg(long)]
    out: PathBuf,

    /// Frame width; defaults to the configured width.
    #[arg(long)]
    width: Option<u32>,

    /// Frame height; defaults to the configured height.
    #[arg(long)]
    height: Option<u32>,

    /// JSON job configuration.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Png,
    Jpg,
    Bmp,
}

impl From<FormatChoice> for ExportFormat {
    fn from(value: FormatChoice) -> Self {
        match value {
            FormatChoice::Png => ExportFormat::Png,
            FormatChoice::Jpg => ExportFormat::Jpeg,
            FormatChoice::Bmp => ExportFormat::Bmp,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Sheet(args) => cmd_sheet(args),
        Command::Gif(args) => cmd_gif(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn read_config(path: Option<&Path>) -> anyhow::Result<SheetConfig> {
    match path {
        Some(p) => SheetConfig::load(p).with_context(|| format!("load config '{}'", p.display())),
        None => Ok(SheetConfig::default()),
    }
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    println!("{}", plan(args.frames, !args.allow_single_row));
    Ok(())
}

fn cmd_sheet(args: SheetArgs) -> anyhow::Result<()> {
    let mut cfg = read_config(args.config.as_deref())?;
    apply_sheet_overrides(&mut cfg, &args);
    cfg.validate().context("invalid settings")?;

    let mut doc = Document::new(cfg);
    doc.load_gif(&args.in_path)?;
    for path in &args.add_image {
        doc.add_image_frame(path)
            .with_context(|| format!("add image '{}'", path.display()))?;
    }

    let outcome = doc.render_export();
    if let Some(status) = outcome.status() {
        eprintln!("warning: {status}");
    }

    let out = if args.out.is_dir() {
        args.out.join(doc.texture_file_name())
    } else {
        args.out.clone()
    };
    gifsheet::save_sheet(
        &outcome.sheet.image,
        doc.config.bg_color,
        &out,
        doc.config.export_format,
    )?;

    println!(
        "{} ({} frames, grid {}, {}x{})",
        out.display(),
        doc.frame_count(),
        outcome.sheet.grid,
        outcome.sheet.width(),
        outcome.sheet.height()
    );
    Ok(())
}

fn apply_sheet_overrides(cfg: &mut SheetConfig, args: &SheetArgs) {
    if args.auto {
        cfg.auto_size = true;
    }
    if let (Some(w), Some(h)) = (args.width, args.height) {
        cfg.auto_size = false;
        cfg.width = w;
        cfg.height = h;
    }
    if let Some(bg) = &args.bg {
        cfg.bg_color = BackgroundSpec::parse_or_transparent(bg);
    }
    if args.borderless {
        cfg.borderless = true;
    }
    if let Some(format) = args.format {
        cfg.export_format = format.into();
    }
    if args.allow_single_row {
        cfg.avoid_single_row_for_odd_counts = false;
    }

    let tile = &mut cfg.effects.tile;
    if args.tile_grayscale {
        tile.grayscale = true;
    }
    if let Some(amount) = args.tile_sharpen {
        tile.sharpen = true;
        tile.sharpen_amount = amount;
    }
    if let Some(radius) = args.tile_blur {
        tile.blur = true;
        tile.blur_radius = radius;
    }
    if let Some(factor) = args.tile_transparency {
        tile.transparency = true;
        tile.transparency_factor = factor;
    }
    if let Some(level) = args.tile_intensity {
        tile.color_intensity = true;
        tile.color_intensity_level = level;
    }
}

fn cmd_gif(args: GifArgs) -> anyhow::Result<()> {
    let mut cfg = read_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        cfg.width = width;
    }
    if let Some(height) = args.height {
        cfg.height = height;
    }
    cfg.validate().context("invalid settings")?;
    let size = TileSize::new(cfg.width, cfg.height);
    let delay_ms = 1000 / cfg.framerate.max(1);

    let mut doc = Document::new(cfg);
    doc.load_gif(&args.in_path)?;
    gifsheet::save_animated_gif(
        doc.frames(),
        size,
        &doc.config.effects.frame,
        delay_ms,
        &args.out,
    )?;

    println!(
        "{} ({} frames, {}x{})",
        args.out.display(),
        doc.frame_count(),
        size.width,
        size.height
    );
    Ok(())
}
