use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use serde::Deserialize;

use crate::slots::SlotTable;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub slots: Arc<SlotTable>,
}

impl AppState {
    pub fn new(slots: Arc<SlotTable>) -> Self {
        AppState {
            workspace: None,
            db: None,
            slots,
        }
    }
}
