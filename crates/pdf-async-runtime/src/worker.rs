use crate::{ConversionCommand, ConversionUpdate};
use pdf_analytics::{AnalyticsSink, track_pdf_conversion};
use pdf_images::{ConversionEvent, ConversionOptions, ConversionRequest, convert_images};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Worker is no longer running")]
    WorkerClosed,
}

/// Sending side of a running worker
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    command_tx: mpsc::UnboundedSender<ConversionCommand>,
}

impl WorkerHandle {
    pub fn submit(&self, command: ConversionCommand) -> Result<(), RuntimeError> {
        self.command_tx
            .send(command)
            .map_err(|_| RuntimeError::WorkerClosed)
    }

    pub fn convert(
        &self,
        request: ConversionRequest,
        options: ConversionOptions,
    ) -> Result<(), RuntimeError> {
        self.submit(ConversionCommand::Convert { request, options })
    }

    pub fn shutdown(&self) -> Result<(), RuntimeError> {
        self.submit(ConversionCommand::Shutdown)
    }
}

/// Spawn [`worker_task`] on the current runtime
pub fn spawn_worker(
    analytics: Arc<dyn AnalyticsSink>,
) -> (
    WorkerHandle,
    mpsc::UnboundedReceiver<ConversionUpdate>,
    JoinHandle<()>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(worker_task(command_rx, update_tx, analytics));
    (WorkerHandle { command_tx }, update_rx, task)
}

/// Async worker task that processes conversion commands one at a time
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<ConversionCommand>,
    update_tx: mpsc::UnboundedSender<ConversionUpdate>,
    analytics: Arc<dyn AnalyticsSink>,
) {
    while let Some(cmd) = command_rx.recv().await {
        match cmd {
            ConversionCommand::Convert { request, options } => {
                handle_convert(request, options, &update_tx, analytics.as_ref()).await;
            }
            ConversionCommand::Shutdown => {
                log::debug!("Worker shutting down");
                break;
            }
        }
    }
}

async fn handle_convert(
    request: ConversionRequest,
    options: ConversionOptions,
    update_tx: &mpsc::UnboundedSender<ConversionUpdate>,
    analytics: &dyn AnalyticsSink,
) {
    let _ = update_tx.send(ConversionUpdate::Started {
        image_count: request.sources.len(),
    });

    let progress_tx = update_tx.clone();
    let result = convert_images(&request, &options, move |event| {
        let update = match event {
            ConversionEvent::ImagePlaced { index, total, .. } => ConversionUpdate::Progress {
                operation: "Placing images".to_string(),
                current: index + 1,
                total,
            },
            ConversionEvent::ImageSkipped { index, reason, .. } => {
                ConversionUpdate::ImageSkipped { index, reason }
            }
        };
        let _ = progress_tx.send(update);
    })
    .await;

    match result {
        Ok(report) => {
            track_pdf_conversion(analytics, report.pages, &report.file_name);
            let _ = update_tx.send(ConversionUpdate::Complete {
                path: report.output_path,
                file_name: report.file_name,
                pages: report.pages,
                skipped: report.skipped,
            });
        }
        Err(e) => {
            log::error!("Failed to generate PDF: {e}");
            let _ = update_tx.send(ConversionUpdate::Error {
                message: format!("Failed to generate PDF: {e}"),
            });
        }
    }
}
