//! Process-wide service registry.
//!
//! Everything a request handler can touch is constructed once in `main` and
//! shared through an `Arc<AppState>`. Optional capabilities (tabular
//! classifier) are explicit `Option`s; their absence degrades the matching
//! endpoint instead of panicking mid-request.

use std::sync::Mutex;

use onco_config::Settings;
use onco_inference::{Summarizer, TabularPredictor, VisionClient};
use tokio::sync::mpsc::UnboundedSender;

use crate::services::analysis::AnalysisJob;
use crate::services::supervisor::Supervisor;

pub struct AppState {
    pub settings: Settings,
    pub http: reqwest::Client,
    pub db: Mutex<rusqlite::Connection>,
    pub supervisor: Supervisor,
    pub summarizer: Summarizer,
    pub vision: VisionClient,
    pub predictor: Option<TabularPredictor>,
    pub analysis_tx: UnboundedSender<AnalysisJob>,
}
