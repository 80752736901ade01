use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pdf_analytics::{AnalyticsConfig, AnalyticsSink, LogSink};
use pdf_async_runtime::{ConversionState, ConversionUpdate, spawn_worker};
use pdf_images::{ConversionOptions, ImageDimensions, PageSpec, compute_placement};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// How long to wait for analytics delivery before exiting
const ANALYTICS_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

mod logger;

#[derive(Parser)]
#[command(name = "img2pdf", about = "Combine images into a PDF, one per page", version)]
struct Cli {
    /// Increase log output (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct PageArgs {
    /// Paper size
    #[arg(long, value_enum)]
    paper: Option<PaperArg>,

    /// Page orientation
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Margin in mm (uniform on all sides)
    #[arg(long)]
    margin: Option<f32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert images into a single PDF
    Convert {
        /// Input images, one page each, in order
        #[arg(required = true, num_args = 1..)]
        images: Vec<PathBuf>,

        /// Display name, used as the file name prefix
        #[arg(short, long)]
        name: Option<String>,

        /// Directory the PDF is written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        page: PageArgs,

        /// What to do when an image cannot be read
        #[arg(long, value_enum)]
        on_error: Option<FailureArg>,

        /// Load options from a JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the effective options to a JSON file
        #[arg(long)]
        save_config: Option<PathBuf>,

        /// Log analytics events instead of sending them
        #[arg(long)]
        log_events: bool,
    },

    /// Show where an image of the given size lands on the page
    Layout {
        /// Image width in pixels
        #[arg(long)]
        width: f32,

        /// Image height in pixels
        #[arg(long)]
        height: f32,

        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum FailureArg {
    Abort,
    Skip,
}

impl From<PaperArg> for pdf_images::PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
        }
    }
}

impl From<OrientationArg> for pdf_images::Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl From<FailureArg> for pdf_images::FailurePolicy {
    fn from(arg: FailureArg) -> Self {
        match arg {
            FailureArg::Abort => Self::AbortBatch,
            FailureArg::Skip => Self::SkipImage,
        }
    }
}

impl PageArgs {
    fn apply(&self, options: &mut ConversionOptions) {
        if let Some(paper) = self.paper {
            options.paper_size = paper.into();
        }
        if let Some(orientation) = self.orientation {
            options.orientation = orientation.into();
        }
        if let Some(margin) = self.margin {
            options.margin_mm = margin;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logger::CliLogger::new(logger::level_from_flags(cli.verbose, cli.quiet))
        .init()
        .context("Failed to install logger")?;

    match cli.command {
        Commands::Convert {
            images,
            name,
            output_dir,
            page,
            on_error,
            config,
            save_config,
            log_events,
        } => {
            let mut options = match &config {
                Some(path) => ConversionOptions::load(path)
                    .await
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => ConversionOptions::default(),
            };
            page.apply(&mut options);
            if let Some(dir) = output_dir {
                options.output_dir = dir;
            }
            if let Some(policy) = on_error {
                options.failure_policy = policy.into();
            }
            options.validate()?;

            if let Some(path) = &save_config {
                options.save(path).await?;
                log::info!("Saved options to {}", path.display());
            }

            let analytics: Arc<dyn AnalyticsSink> = if log_events {
                Arc::new(LogSink)
            } else {
                Arc::from(AnalyticsConfig::from_env().into_sink())
            };

            let mut state = ConversionState::default().with_images(images);
            if let Some(name) = &name {
                state = state.with_name(name);
            }

            let (worker, mut updates, task) = spawn_worker(Arc::clone(&analytics));
            worker.convert(state.request(), options)?;

            let mut outcome = Ok(());
            while let Some(update) = updates.recv().await {
                state = state.apply(&update);
                match update {
                    ConversionUpdate::Started { image_count } => {
                        log::info!("Converting {} image(s)", image_count);
                    }
                    ConversionUpdate::Progress {
                        operation,
                        current,
                        total,
                    } => {
                        log::info!("{} {}/{}", operation, current, total);
                    }
                    ConversionUpdate::ImageSkipped { index, reason } => {
                        eprintln!("Skipped image #{}: {}", index + 1, reason);
                    }
                    ConversionUpdate::Complete { path, pages, .. } => {
                        println!("Generated {} page(s) → {}", pages, path.display());
                        if !state.skipped.is_empty() {
                            println!("  {} image(s) skipped", state.skipped.len());
                        }
                        break;
                    }
                    ConversionUpdate::Error { message } => {
                        outcome = Err(anyhow::anyhow!(message));
                        break;
                    }
                }
            }

            worker.shutdown()?;
            task.await?;
            tokio::task::spawn_blocking(move || analytics.flush(ANALYTICS_FLUSH_TIMEOUT)).await?;
            outcome?;
        }

        Commands::Layout {
            width,
            height,
            page,
        } => {
            let mut options = ConversionOptions::default();
            page.apply(&mut options);
            options.validate()?;

            let Some(image) = ImageDimensions::new(width, height) else {
                bail!("Image size must be positive, got {}x{}", width, height);
            };
            let spec: PageSpec = options.page_spec();
            let plan = compute_placement(image, &spec, true);
            let placement = plan.placement;
            let (avail_w, avail_h) = spec.content_box();

            println!("Page Layout:");
            println!(
                "  Page: {:.2} x {:.2} mm (margin {:.2} mm)",
                spec.page_width, spec.page_height, spec.margin
            );
            println!("  Content box: {:.2} x {:.2} mm", avail_w, avail_h);
            println!(
                "  Image: {:.2} x {:.2} mm",
                placement.width, placement.height
            );
            println!("  Offset: x={:.2} y={:.2} mm", placement.x, placement.y);
        }
    }

    Ok(())
}
