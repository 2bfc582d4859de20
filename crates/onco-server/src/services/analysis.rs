//! Deferred report analysis: an explicit task queue whose result sink is the
//! report row.
//!
//! Uploads enqueue an [`AnalysisJob`] after the row is inserted in
//! `processing`; a single worker loop consumes jobs, runs
//! extract → summarize, and applies the one terminal transition. Nothing is
//! retried and no caller is notified beyond the stored status.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use onco_core::{CoreError, ReportStatus};
use onco_inference::{extract_pdf_text, ImageSource, TRANSCRIBE_INSTRUCTION};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::db;
use crate::state::AppState;

/// What the extractor should treat the stored file as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Pdf,
    Image,
}

#[derive(Debug)]
pub struct AnalysisJob {
    pub report_id: i64,
    pub file_path: PathBuf,
    pub kind: UploadKind,
}

/// Spawns the worker loop that drains the analysis queue.
pub fn spawn_worker(
    state: Arc<AppState>,
    mut rx: UnboundedReceiver<AnalysisJob>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Analysis worker started");
        while let Some(job) = rx.recv().await {
            process_job(&state, job).await;
        }
        info!("Analysis worker stopped");
    })
}

async fn process_job(state: &AppState, job: AnalysisJob) {
    info!("Analyzing report {} ({:?})", job.report_id, job.kind);

    let (status, text) = match analyze_file(state, &job.file_path, job.kind).await {
        Ok(summary) => (ReportStatus::Analyzed, summary),
        Err(e) => (ReportStatus::Failed, e.to_string()),
    };

    let written = state
        .db
        .lock()
        .map_err(|_| ())
        .and_then(|conn| db::complete_report(&conn, job.report_id, status, &text).map_err(|_| ()));

    match written {
        Ok(true) => info!("Report {} -> {}", job.report_id, status.as_str()),
        Ok(false) => error!("Report {} was already terminal", job.report_id),
        Err(()) => error!("Failed to persist result for report {}", job.report_id),
    }
}

/// Extracts text from the stored file and summarizes it. Shared by the
/// worker loop and the synchronous test-identity upload path.
pub async fn analyze_file(
    state: &AppState,
    path: &Path,
    kind: UploadKind,
) -> Result<String, CoreError> {
    let raw_text = match kind {
        UploadKind::Pdf => {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || extract_pdf_text(&path))
                .await
                .map_err(|e| CoreError::Extraction(e.to_string()))??
        }
        UploadKind::Image => {
            let source = ImageSource::LocalPath(path.to_path_buf());
            state.vision.infer(TRANSCRIBE_INSTRUCTION, Some(&source)).await?
        }
    };

    if raw_text.trim().is_empty() {
        return Ok("No readable text found.".to_string());
    }

    state.summarizer.summarize(&raw_text).await
}
