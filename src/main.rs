use clap::{Parser, Subcommand};
use image::Rgba;
use passport_sheet::cache::{CacheKey, RemovalCache};
use passport_sheet::config::{self, AppConfig};
use passport_sheet::export::{self, ExportFormat};
use passport_sheet::geometry::PhotoSize;
use passport_sheet::grid::PageLayout;
use passport_sheet::imaging::{self, Brightness, CopyCount, parse_hex_color};
use passport_sheet::logger;
use passport_sheet::output::{self, ComposeSummary, RemovalSource};
use passport_sheet::removal::{BackgroundRemover, HttpRemover};
use passport_sheet::session::{RemovalStart, Session};
use std::error::Error;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "passport-sheet")]
#[command(about = "Compose print-ready A4 sheets of passport photos")]
#[command(long_about = "\
Compose print-ready A4 sheets of passport photos

Loads a portrait, optionally cuts the subject out via a background-removal
service, crops it to the aspect ratio of a standard photo size, and tiles
copies onto an A4 page at 300 DPI, exported as PDF, JPG or PNG.

Photo sizes:
  2x2       2 × 2 in       (600 × 600 px)
  3.5x4.5   3.5 × 4.5 cm   (413 × 531 px)
  5x5       5 × 5 cm       (591 × 591 px)

Settings are read from ./passport-sheet.toml when present; flags override it.
Run 'passport-sheet gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file [default: ./passport-sheet.toml if present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug diagnostics to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a sheet from a photo and export it
    Compose(ComposeArgs),
    /// Show how many copies fit per row and how many rows a sheet needs
    Layout {
        /// Photo size
        #[arg(long)]
        size: Option<PhotoSize>,
        /// Number of copies
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=40))]
        copies: Option<u32>,
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// List the supported photo sizes
    Sizes,
    /// Print a stock passport-sheet.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct ComposeArgs {
    /// Photo to compose (any format the image decoder recognises)
    input: PathBuf,

    /// Cut the subject out with the background-removal service
    #[arg(long)]
    remove_bg: bool,

    /// Fill color behind the subject, as #rrggbb
    #[arg(long, value_parser = parse_hex_color)]
    background: Option<Rgba<u8>>,

    /// Brightness offset, -100 to 100
    #[arg(long, allow_negative_numbers = true, value_parser = clap::value_parser!(i32).range(-100..=100))]
    brightness: Option<i32>,

    /// Photo size
    #[arg(long)]
    size: Option<PhotoSize>,

    /// Number of copies on the sheet (1-40)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=40))]
    copies: Option<u32>,

    /// Drag the crop from its center by DX,DY image pixels
    #[arg(long, value_name = "DX,DY", allow_hyphen_values = true, value_parser = parse_offset)]
    drag: Option<(f64, f64)>,

    /// Drag the crop's resize handle by DW image pixels
    #[arg(long, value_name = "DW", allow_negative_numbers = true)]
    resize: Option<f64>,

    /// Also write the quarter-scale sheet preview as PNG
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Export format
    #[arg(long)]
    format: Option<ExportFormat>,

    /// Directory for passport_photos.<ext>
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Ignore the on-disk removal cache
    #[arg(long)]
    no_cache: bool,
}

fn parse_offset(value: &str) -> Result<(f64, f64), String> {
    let (dx, dy) = value
        .split_once(',')
        .ok_or_else(|| format!("expected DX,DY, got '{value}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid offset '{s}': {e}"))
    };
    Ok((parse(dx)?, parse(dy)?))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    match cli.command {
        Command::Compose(args) => {
            let config = config::load_config(cli.config.as_deref())?;
            let summary = compose(&config, args).await?;
            output::print_compose_summary(&summary);
        }
        Command::Layout { size, copies, json } => {
            let config = config::load_config(cli.config.as_deref())?;
            let size = size.unwrap_or(config.sheet.size);
            let copies = CopyCount::new(copies.unwrap_or(config.sheet.copies));
            let layout = PageLayout::print(size).summary(copies.value());
            if json {
                println!("{}", serde_json::to_string_pretty(&layout)?);
            } else {
                output::print_layout(&layout);
            }
        }
        Command::Sizes => output::print_sizes(),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Run the whole pipeline for one photo: upload, removal, gestures, preview,
/// export.
async fn compose(config: &AppConfig, args: ComposeArgs) -> Result<ComposeSummary, Box<dyn Error>> {
    let bytes = std::fs::read(&args.input)?;
    let image = imaging::decode_image(&bytes)?;
    let dimensions = image.dimensions();

    let mut settings = config.adjustment_settings()?;
    if let Some(background) = args.background {
        settings.background = background;
    }
    if let Some(brightness) = args.brightness {
        settings.brightness = Brightness::new(brightness);
    }
    let size = args.size.unwrap_or(config.sheet.size);
    let copies = CopyCount::new(args.copies.unwrap_or(config.sheet.copies));

    let mut session = Session::new(size, copies, settings);
    session.upload(image)?;

    let removal = if args.remove_bg {
        remove_background(&mut session, config, &bytes, !args.no_cache).await?
    } else {
        RemovalSource::Off
    };

    if let Some((dx, dy)) = args.drag {
        session.replay_drag(dx, dy);
    }
    if let Some(dw) = args.resize {
        session.replay_resize(dw);
    }

    if let Some(path) = &args.preview
        && let Some(preview) = session.preview()
    {
        write_png(path, preview)?;
    }

    let format = args.format.unwrap_or(config.export.format);
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| config.export.output_dir.clone());
    let exported = match session.export(format)? {
        Some(encoded) => {
            let path = export::write_export(&output_dir, format, &encoded)?;
            Some((format, path, encoded.len()))
        }
        None => None,
    };

    Ok(ComposeSummary {
        input: args.input,
        dimensions,
        removal,
        settings: session.settings(),
        photo_size: session.photo_size(),
        crop: session.crop_rect().unwrap_or_default(),
        layout: session.layout().summary(session.copies().value()),
        preview: args.preview,
        export: exported,
    })
}

/// Switch the session to the background-removed variant, from the on-disk
/// cache when possible and from the service otherwise. A service failure
/// leaves the session on the original composite and is reported, not raised.
async fn remove_background(
    session: &mut Session,
    config: &AppConfig,
    upload: &[u8],
    use_cache: bool,
) -> Result<RemovalSource, Box<dyn Error>> {
    let RemovalStart::Request(request) = session.begin_removal()? else {
        return Ok(RemovalSource::Service);
    };

    let cache = RemovalCache::new(&config.removal.cache_dir);
    let key = CacheKey::new(upload, &config.removal.endpoint);
    if use_cache && let Some(cut_out) = cache.find(&key) {
        session.finish_removal(request.token, Ok(cut_out))?;
        return Ok(RemovalSource::Cache);
    }

    let outcome = match HttpRemover::new(&config.removal.endpoint, &config.removal.user_agent) {
        Ok(remover) => remover.remove_background(&request.image).await,
        Err(e) => Err(e),
    };
    if use_cache
        && let Ok(cut_out) = &outcome
        && let Err(e) = cache.store(&key, cut_out)
    {
        tracing::warn!("Could not cache removal result: {e}");
    }
    match session.finish_removal(request.token, outcome) {
        Ok(_) => Ok(RemovalSource::Service),
        Err(e) => {
            tracing::warn!("Background removal failed, keeping the original: {e}");
            Ok(RemovalSource::Failed(e.to_string()))
        }
    }
}

fn write_png(path: &Path, image: &image::RgbaImage) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, imaging::encode_png(image)?)?;
    Ok(())
}
