use std::sync::Arc;

use crate::config::Config;
use crate::ocr::OcrEngine;

/// Shared, read-only per-process state handed to every handler.
pub struct AppState {
    pub config: Config,
    pub ocr: Arc<dyn OcrEngine>,
}

impl AppState {
    pub fn new(config: Config, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { config, ocr }
    }
}
