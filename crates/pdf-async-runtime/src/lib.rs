use std::path::PathBuf;

mod state;
mod worker;

pub use state::ConversionState;
pub use worker::{RuntimeError, WorkerHandle, spawn_worker, worker_task};

// Re-export types from library crates
pub use pdf_analytics::AnalyticsSink;
pub use pdf_images::{ConversionOptions, ConversionRequest, SkippedImage};

/// Commands sent from the front end to the worker
#[derive(Debug)]
pub enum ConversionCommand {
    Convert {
        request: ConversionRequest,
        options: ConversionOptions,
    },
    Shutdown,
}

/// Updates sent from the worker to the front end
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionUpdate {
    Started {
        image_count: usize,
    },
    Progress {
        operation: String,
        current: usize,
        total: usize,
    },
    ImageSkipped {
        index: usize,
        reason: String,
    },
    Complete {
        path: PathBuf,
        file_name: String,
        pages: usize,
        skipped: Vec<SkippedImage>,
    },
    Error {
        message: String,
    },
}
