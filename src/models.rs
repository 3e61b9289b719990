use std::sync::Arc;

use crate::charts::{ChartDispatcher, ChartKind, ColumnPrompt, ColumnSelection};
use crate::config::Config;
use crate::dataset::{Column, Preview};
use crate::llm::provider::LLM;
use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionRegistry,
    pub llm: Arc<LLM>,
    pub charts: ChartDispatcher,
}

impl AppState {
    pub fn new(config: Config, llm: Arc<LLM>, charts: ChartDispatcher) -> Self {
        Self {
            sessions: SessionRegistry::new(config.data.max_sessions),
            llm,
            charts,
            config,
        }
    }
}

/// Column dropdowns for the chart the current question asked for.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChartPromptView {
    pub kind: ChartKind,
    pub prompts: Vec<ColumnPrompt>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionView {
    pub session_id: uuid::Uuid,
    pub filename: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub revision: u64,
    pub columns: Vec<Column>,
    pub row_count: usize,
    pub preview: Preview,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub chart: Option<ChartPromptView>,
    pub selection: Option<ColumnSelection>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ChartResponse {
    pub session_id: uuid::Uuid,
    pub revision: u64,
    pub kind: ChartKind,
    pub title: String,
    pub format: String,
    pub svg: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct JsonColumnResponse {
    pub column: String,
    pub values: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub sessions: usize,
}
