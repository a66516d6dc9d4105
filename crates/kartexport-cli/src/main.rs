use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kartexport::wms::AxisOrder;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kartexport", about = "Map print and export CLI", version)]
struct Cli {
    /// Log more (debug output)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a map description to PDF or PNG
    Print {
        /// Map description (JSON: view, size, layers)
        #[arg(short, long)]
        map: PathBuf,

        /// Job options file (JSON); flags below override it
        #[arg(long)]
        options: Option<PathBuf>,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Paper format
        #[arg(long, value_enum)]
        paper: Option<PaperArg>,

        /// Paper orientation
        #[arg(long, value_enum)]
        orientation: Option<OrientationArg>,

        /// Print resolution in dpi
        #[arg(long)]
        dpi: Option<u32>,

        /// Map scale denominator
        #[arg(long)]
        scale: Option<f64>,

        /// Output type
        #[arg(long, value_enum)]
        save_as: Option<OutputArg>,

        /// Map title
        #[arg(long)]
        title: Option<String>,

        /// Comment printed below the title
        #[arg(long)]
        comment: Option<String>,

        /// Directory to write the export to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Logo image (URL or path)
        #[arg(long)]
        logo: Option<String>,

        /// North arrow image (URL or path)
        #[arg(long)]
        north_arrow: Option<String>,

        /// Add a QR code linking to the map
        #[arg(long)]
        qr_code: bool,

        /// Leave out the scale bar
        #[arg(long)]
        no_scale_bar: bool,

        /// Print without a white margin
        #[arg(long)]
        no_margin: bool,

        /// Move title and footer text into a widened margin
        #[arg(long)]
        text_in_margin: bool,

        /// Largest WMS image edge before requests are tiled
        #[arg(long)]
        max_tile_size: Option<u32>,
    },

    /// Show how an oversized WMS request would be tiled
    PlanTiles {
        /// Request width in pixels
        #[arg(long)]
        width: u32,

        /// Request height in pixels
        #[arg(long)]
        height: u32,

        /// Bounding box as sent on the wire, e.g. `48,7.5,52,12`
        #[arg(long, required = true, value_delimiter = ',', allow_hyphen_values = true)]
        bbox: Vec<f64>,

        /// WMS version of the request
        #[arg(long, default_value = "1.3.0")]
        wms_version: String,

        /// Maximum tile edge length in pixels
        #[arg(long, default_value = "2048")]
        max_tile_size: u32,
    },

    /// Show the scale bar layout for a map scale
    ScaleBar {
        /// Map scale denominator
        #[arg(value_parser = parse_scale)]
        scale: f64,
    },
}

/// Scale denominators must be finite and positive
fn parse_scale(value: &str) -> std::result::Result<f64, String> {
    let scale: f64 = value
        .parse()
        .map_err(|e| format!("'{}' is not a number: {}", value, e))?;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(format!("Scale must be a positive number, got {}", value));
    }
    Ok(scale)
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputArg {
    Pdf,
    Png,
    Blob,
}

impl From<PaperArg> for kartexport::PaperFormat {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A0 => Self::A0,
            PaperArg::A1 => Self::A1,
            PaperArg::A2 => Self::A2,
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
        }
    }
}

impl From<OrientationArg> for kartexport::Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl From<OutputArg> for kartexport::OutputType {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Pdf => Self::Pdf,
            OutputArg::Png => Self::Png,
            OutputArg::Blob => Self::Blob,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Print {
            map,
            options,
            config,
            paper,
            orientation,
            dpi,
            scale,
            save_as,
            title,
            comment,
            output_dir,
            logo,
            north_arrow,
            qr_code,
            no_scale_bar,
            no_margin,
            text_in_margin,
            max_tile_size,
        } => {
            let mut job = match &options {
                Some(path) => kartexport::PrintJobOptions::load(path)
                    .await
                    .with_context(|| format!("loading job options {}", path.display()))?,
                None => kartexport::PrintJobOptions::default(),
            };
            let mut settings = match &config {
                Some(path) => kartexport::PrintConfig::load(path)
                    .await
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => kartexport::PrintConfig::default(),
            };

            if let Some(paper) = paper {
                job.format = paper.into();
            }
            if let Some(orientation) = orientation {
                job.orientation = orientation.into();
            }
            if let Some(dpi) = dpi {
                job.resolution = dpi;
            }
            if let Some(scale) = scale {
                job.scale = scale;
            }
            if let Some(save_as) = save_as {
                job.save_as = save_as.into();
            }
            if let Some(title) = title {
                job.map_title = title;
            }
            if let Some(comment) = comment {
                job.print_comment = comment;
            }
            if logo.is_some() {
                job.logo.enabled = true;
                settings.logo_url = logo;
            }
            if north_arrow.is_some() {
                job.north_arrow.enabled = true;
                settings.north_arrow_url = north_arrow;
            }
            if qr_code {
                job.qr_code.enabled = true;
            }
            if no_scale_bar {
                job.scale_bar.enabled = false;
            }
            if no_margin {
                job.use_margin = false;
            }
            if text_in_margin {
                job.use_text_icons_in_margin = true;
            }
            if output_dir.is_some() {
                settings.output_dir = output_dir;
            }
            if let Some(max_tile_size) = max_tile_size {
                settings.max_tile_size = max_tile_size;
            }

            log::debug!("Job options: {:?}", job);
            let fetcher = Arc::new(kartexport::HttpFetcher::new());
            let headless = kartexport::HeadlessMap::load(&map, fetcher.clone())
                .await
                .with_context(|| format!("loading map {}", map.display()))?;

            let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
            let mut composer = kartexport::PrintComposer::new(headless, fetcher, settings)?
                .with_events(events_tx);

            let events = tokio::spawn(async move {
                while let Some(event) = events_rx.recv().await {
                    match event {
                        kartexport::PrintEvent::ErrorLoadingImage { error, asset } => {
                            eprintln!("Could not load {}: {}", asset, error)
                        }
                        kartexport::PrintEvent::TilesIncomplete {
                            layer,
                            failed,
                            total,
                        } => eprintln!("Layer '{}': {} of {} tiles missing", layer, failed, total),
                        kartexport::PrintEvent::FailedToSave { message } => {
                            eprintln!("Export failed: {}", message)
                        }
                        kartexport::PrintEvent::Completed { .. } => {}
                    }
                }
            });

            let controller = kartexport::CancellationController::new();
            let ctrl_c = controller.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let result = composer.print(&job, controller.token()).await;
            drop(composer);
            // Drain remaining notifications before reporting
            let _ = events.await;

            match result? {
                Some(output) => match &output.path {
                    Some(path) => println!("Exported → {}", path.display()),
                    None => println!(
                        "Rendered {} ({} bytes, {})",
                        output.file_name,
                        output.bytes.len(),
                        output.mime_type()
                    ),
                },
                None => println!("Cancelled"),
            }
        }

        Commands::PlanTiles {
            width,
            height,
            bbox,
            wms_version,
            max_tile_size,
        } => {
            let bbox: [f64; 4] = bbox
                .try_into()
                .map_err(|_| anyhow::anyhow!("--bbox needs exactly 4 numbers"))?;
            let axis_order = AxisOrder::for_version(&wms_version);
            let tiles =
                kartexport::tiling::plan_tiles(width, height, bbox, axis_order, max_tile_size)?;

            println!(
                "{} tiles for {}x{} ({:?}, max {}px):",
                tiles.len(),
                width,
                height,
                axis_order,
                max_tile_size
            );
            for tile in &tiles {
                println!(
                    "  +{}+{} {}x{}  bbox {:?}",
                    tile.x_offset, tile.y_offset, tile.width, tile.height, tile.bbox
                );
            }
        }

        Commands::ScaleBar { scale } => {
            let spec = kartexport::render::ScaleBarSpec::compute(scale);
            println!("Scale bar for 1:{}:", scale);
            println!("  Length: {} m ({:.2} pt)", spec.length_meters, spec.length_points);
            println!("  Divisions: {}", spec.divider);
            println!(
                "  Ticks (pt): {}",
                spec.division_tick_positions
                    .iter()
                    .map(|p| format!("{:.2}", p))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            if let Some(sub) = spec.subdivision {
                println!("  Subdivision at {:.2} pt", sub);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_bar_rejects_non_positive_scales() {
        for scale in ["0", "NaN", "inf", "abc"] {
            let parsed = Cli::try_parse_from(["kartexport", "scale-bar", scale]);
            assert!(parsed.is_err(), "accepted {}", scale);
        }
        let parsed = Cli::try_parse_from(["kartexport", "scale-bar", "--", "-500"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_scale_bar_accepts_denominator() {
        let cli = Cli::try_parse_from(["kartexport", "scale-bar", "2500"]).unwrap();
        assert!(matches!(cli.command, Commands::ScaleBar { scale } if scale == 2500.0));
    }
}
