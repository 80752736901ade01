//! Images to PDF conversion pipeline
//!
//! 1. Decode every source as its own task (decoding may overlap)
//! 2. Walk the results strictly in selection order, placing each image
//!    on its own page of a single backend
//! 3. Serialize the document under a name derived from the display name

use crate::decode::{DecodedImage, ImageSource, load_image};
use crate::document::{LopdfBackend, PdfBackend, save_pdf};
use crate::layout::{PagePlan, compute_placement};
use crate::options::ConversionOptions;
use crate::types::*;
use std::path::PathBuf;
use tokio::task::JoinHandle;

/// File name used when no display name was given
pub const DEFAULT_FILE_NAME: &str = "images.pdf";

/// Pending decode of one source
pub type DecodeTask = JoinHandle<std::result::Result<DecodedImage, ImageFailure>>;

/// Output file name for an optional display name
pub fn output_file_name(display_name: Option<&str>) -> String {
    match display_name {
        Some(name) if !name.is_empty() => format!("{}_images.pdf", name),
        _ => DEFAULT_FILE_NAME.to_string(),
    }
}

/// Trim a user-entered name; blank input means no name
pub fn normalize_display_name(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Images to convert, in selection order
#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    pub sources: Vec<ImageSource>,
    pub display_name: Option<String>,
}

impl ConversionRequest {
    pub fn new(sources: Vec<ImageSource>, display_name: Option<&str>) -> Self {
        Self {
            sources,
            display_name: display_name.and_then(normalize_display_name),
        }
    }

    pub fn file_name(&self) -> String {
        output_file_name(self.display_name.as_deref())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(ConvertError::NoImages);
        }
        if let Some(name) = &self.display_name {
            if name.contains(['/', '\\']) {
                return Err(ConvertError::Config(format!(
                    "Display name must not contain path separators: {:?}",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Progress notifications, delivered in selection order
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionEvent {
    ImagePlaced {
        index: usize,
        total: usize,
        page: usize,
    },
    ImageSkipped {
        index: usize,
        total: usize,
        reason: String,
    },
}

/// An image left out under [`FailurePolicy::SkipImage`]
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedImage {
    pub index: usize,
    pub label: String,
    pub reason: String,
}

/// Outcome of the placement stage
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlacementSummary {
    pub placed: usize,
    pub skipped: Vec<SkippedImage>,
}

/// Outcome of a finished conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub file_name: String,
    pub output_path: PathBuf,
    pub pages: usize,
    pub skipped: Vec<SkippedImage>,
}

/// Convert the requested images into one PDF on disk.
pub async fn convert_images<F>(
    request: &ConversionRequest,
    options: &ConversionOptions,
    on_event: F,
) -> Result<ConversionReport>
where
    F: FnMut(ConversionEvent),
{
    options.validate()?;
    request.validate()?;

    let file_name = request.file_name();
    let page = options.page_spec();
    log::info!("Converting {} image(s) to {}", request.sources.len(), file_name);

    let mut backend = LopdfBackend::new(page);
    if let Some(name) = &request.display_name {
        backend = backend.with_title(format!("{} images", name));
    }

    let decoded = spawn_decoders(&request.sources);
    let summary = place_decoded(&mut backend, &request.sources, decoded, options, on_event).await?;

    let output_path = options.output_dir.join(&file_name);
    let doc = backend.finish()?;
    save_pdf(doc, &output_path).await?;
    log::info!(
        "Wrote {} page(s) to {}",
        summary.placed,
        output_path.display()
    );

    Ok(ConversionReport {
        file_name,
        output_path,
        pages: summary.placed,
        skipped: summary.skipped,
    })
}

/// Start one decode task per source.
pub fn spawn_decoders(sources: &[ImageSource]) -> Vec<DecodeTask> {
    sources
        .iter()
        .cloned()
        .map(|source| tokio::spawn(async move { load_image(&source).await }))
        .collect()
}

/// Place decoded images on `backend`, one per page, in selection order.
///
/// `decoded` must hold one task per entry of `sources`. Under
/// [`FailurePolicy::AbortBatch`] the first failure cancels the remaining
/// tasks and is returned as [`ConvertError::Image`].
pub async fn place_decoded<B, F>(
    backend: &mut B,
    sources: &[ImageSource],
    decoded: Vec<DecodeTask>,
    options: &ConversionOptions,
    mut on_event: F,
) -> Result<PlacementSummary>
where
    B: PdfBackend,
    F: FnMut(ConversionEvent),
{
    let page = options.page_spec();
    let total = decoded.len();
    let mut summary = PlacementSummary::default();
    let mut tasks = decoded.into_iter().enumerate();

    while let Some((index, task)) = tasks.next() {
        let label = sources
            .get(index)
            .map(ImageSource::label)
            .unwrap_or_else(|| format!("image {}", index + 1));

        let outcome = match task.await {
            Ok(result) => result,
            Err(e) => Err(ImageFailure::TaskJoin(e)),
        };

        let image = match outcome {
            Ok(image) => image,
            Err(failure) => match options.failure_policy {
                FailurePolicy::AbortBatch => {
                    abort_remaining(tasks.by_ref());
                    log::error!("Aborting conversion at {}: {}", label, failure);
                    return Err(ConvertError::Image {
                        index,
                        label,
                        source: failure,
                    });
                }
                FailurePolicy::SkipImage => {
                    log::warn!("Skipping {}: {}", label, failure);
                    let reason = failure.to_string();
                    on_event(ConversionEvent::ImageSkipped {
                        index,
                        total,
                        reason: reason.clone(),
                    });
                    summary.skipped.push(SkippedImage {
                        index,
                        label,
                        reason,
                    });
                    continue;
                }
            },
        };

        // A skipped leading image must not leave the initial page blank
        let plan = compute_placement(image.dimensions, &page, summary.placed == 0);
        if let Err(e) = draw_planned(backend, &image, &plan) {
            abort_remaining(tasks.by_ref());
            return Err(e);
        }
        summary.placed += 1;

        log::debug!(
            "Placed {} on page {} at ({:.2}, {:.2}) size {:.2}x{:.2}",
            label,
            backend.page_count(),
            plan.placement.x,
            plan.placement.y,
            plan.placement.width,
            plan.placement.height
        );
        on_event(ConversionEvent::ImagePlaced {
            index,
            total,
            page: backend.page_count(),
        });
    }

    if summary.placed == 0 {
        return Err(ConvertError::NoImages);
    }

    Ok(summary)
}

fn draw_planned<B: PdfBackend>(
    backend: &mut B,
    image: &DecodedImage,
    plan: &PagePlan,
) -> Result<()> {
    if plan.start_new_page {
        backend.add_page()?;
    }
    backend.draw_image(&image.encoded, &plan.placement)
}

fn abort_remaining(tasks: impl Iterator<Item = (usize, DecodeTask)>) {
    for (_, task) in tasks {
        task.abort();
    }
}
