use crate::layout::PageSpec;
use crate::types::*;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Conversion configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConversionOptions {
    // Page
    pub paper_size: PaperSize,
    pub orientation: Orientation,
    pub margin_mm: f32,

    // Error isolation
    pub failure_policy: FailurePolicy,

    // Output
    pub output_dir: PathBuf,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            orientation: Orientation::Portrait,
            margin_mm: 10.0,
            failure_policy: FailurePolicy::AbortBatch,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ConversionOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| ConvertError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConvertError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn page_spec(&self) -> PageSpec {
        PageSpec::new(self.paper_size, self.orientation, self.margin_mm)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.paper_size.dimensions_mm();
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ConvertError::Config(format!(
                "Paper size must be positive, got {}x{}mm",
                width, height
            )));
        }

        if !self.margin_mm.is_finite() || self.margin_mm < 0.0 {
            return Err(ConvertError::Config(
                "Margin must be a non-negative number".to_string(),
            ));
        }

        let (avail_w, avail_h) = self.page_spec().content_box();
        if avail_w <= 0.0 || avail_h <= 0.0 {
            return Err(ConvertError::Config(format!(
                "Margin of {}mm leaves no room on a {}x{}mm page",
                self.margin_mm, width, height
            )));
        }

        Ok(())
    }
}
