use crate::ConversionUpdate;
use pdf_images::{ConversionRequest, ImageSource, normalize_display_name};
use std::path::PathBuf;
use std::sync::Arc;

/// Snapshot of what the front end shows.
///
/// Never mutated in place: every change produces a new snapshot, either from
/// user input (`with_name`, `with_images`) or from a worker update (`apply`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversionState {
    pub display_name: Option<String>,
    pub images: Arc<[PathBuf]>,
    pub loading: bool,
    /// (current, total) while a conversion runs
    pub progress: Option<(usize, usize)>,
    pub last_output: Option<PathBuf>,
    pub last_error: Option<String>,
    pub skipped: Vec<(usize, String)>,
}

impl ConversionState {
    /// Accept a user-entered name. Blank input keeps the previous name.
    pub fn with_name(&self, input: &str) -> Self {
        match normalize_display_name(input) {
            Some(name) => Self {
                display_name: Some(name),
                ..self.clone()
            },
            None => self.clone(),
        }
    }

    /// Replace the selected images
    pub fn with_images(&self, images: Vec<PathBuf>) -> Self {
        Self {
            images: images.into(),
            ..self.clone()
        }
    }

    /// A conversion can start when images are selected and none is running
    pub fn can_convert(&self) -> bool {
        !self.loading && !self.images.is_empty()
    }

    /// Build the request for the current selection
    pub fn request(&self) -> ConversionRequest {
        ConversionRequest::new(
            self.images.iter().cloned().map(ImageSource::Path).collect(),
            self.display_name.as_deref(),
        )
    }

    /// Fold a worker update into a new snapshot
    pub fn apply(&self, update: &ConversionUpdate) -> Self {
        let mut next = self.clone();
        match update {
            ConversionUpdate::Started { image_count } => {
                next.loading = true;
                next.progress = Some((0, *image_count));
                next.last_error = None;
                next.skipped.clear();
            }
            ConversionUpdate::Progress { current, total, .. } => {
                next.progress = Some((*current, *total));
            }
            ConversionUpdate::ImageSkipped { index, reason } => {
                next.skipped.push((*index, reason.clone()));
            }
            ConversionUpdate::Complete { path, .. } => {
                next.loading = false;
                next.progress = None;
                next.last_output = Some(path.clone());
            }
            ConversionUpdate::Error { message } => {
                next.loading = false;
                next.progress = None;
                next.last_error = Some(message.clone());
            }
        }
        next
    }
}
