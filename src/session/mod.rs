//! Session state
//!
//! Each upload starts a session. The state is an immutable value: every user
//! action is a [`SessionEvent`] and applying it yields a new state with a
//! bumped `revision`, which clients use as their re-render trigger.

pub mod registry;

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::agents::{write_upload, AgentSettings, CsvAgent};
use crate::charts::{chart_request, select_chart, ChartDispatcher, ChartKind, ChartRequest, ColumnSelection};
use crate::config::Config;
use crate::dataset::Dataset;
use crate::llm::provider::LLM;
use crate::models::{ChartPromptView, SessionView};
use crate::types::{AppError, AppResult};

pub use registry::SessionRegistry;

/// Raw uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SubmitQuestion(String),
    SelectColumns(ColumnSelection),
}

#[derive(Clone)]
pub struct SessionState {
    pub id: Uuid,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub dataset: Arc<Dataset>,
    pub agent: Arc<CsvAgent>,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub chart: Option<ChartKind>,
    pub selection: Option<ColumnSelection>,
    pub revision: u64,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .field("rows", &self.dataset.row_count())
            .field("agent_path", &self.agent.path())
            .field("question", &self.question)
            .field("chart", &self.chart)
            .field("selection", &self.selection)
            .field("revision", &self.revision)
            .finish()
    }
}

impl SessionState {
    /// Load the upload, stage it for the agent and build the agent.
    /// An empty file fails here and no session is created.
    pub fn from_upload(upload: &Upload, llm: Arc<LLM>, config: &Config) -> AppResult<Self> {
        let dataset = Dataset::from_csv_bytes(&upload.bytes)?;
        let file = write_upload(&config.data.upload_dir, &upload.bytes)?;
        let agent = CsvAgent::new(llm, AgentSettings::from_config(config), file, &dataset);

        let state = Self {
            id: Uuid::new_v4(),
            filename: upload.filename.clone(),
            created_at: Utc::now(),
            dataset: Arc::new(dataset),
            agent: Arc::new(agent),
            question: None,
            answer: None,
            chart: None,
            selection: None,
            revision: 1,
        };

        info!(
            session_id = %state.id,
            filename = %state.filename,
            rows = state.dataset.row_count(),
            columns = state.dataset.columns().len(),
            "Session created"
        );

        Ok(state)
    }

    pub async fn apply(&self, event: SessionEvent) -> AppResult<Self> {
        match event {
            SessionEvent::SubmitQuestion(question) => self.submit_question(question).await,
            SessionEvent::SelectColumns(selection) => self.select_columns(selection),
        }
    }

    async fn submit_question(&self, question: String) -> AppResult<Self> {
        if question.trim().is_empty() {
            if self.question.is_none() && self.answer.is_none() {
                return Ok(self.clone());
            }
            return Ok(Self {
                question: None,
                answer: None,
                chart: None,
                selection: None,
                revision: self.revision + 1,
                ..self.clone()
            });
        }

        // Same question as the one already answered: no second round trip.
        if self.answer.is_some() && self.question.as_deref() == Some(question.as_str()) {
            return Ok(self.clone());
        }

        let answer = self.agent.ask(&question).await?;
        let chart = select_chart(&question);
        info!(
            session_id = %self.id,
            chart = ?chart,
            "Question answered"
        );

        Ok(Self {
            question: Some(question),
            answer: Some(answer),
            chart,
            selection: None,
            revision: self.revision + 1,
            ..self.clone()
        })
    }

    /// Store a column choice for the current chart kind.
    pub fn select_columns(&self, selection: ColumnSelection) -> AppResult<Self> {
        let kind = self.chart.ok_or_else(|| {
            AppError::InvalidRequest("the current question does not ask for a chart".to_string())
        })?;
        chart_request(kind, &selection, &self.dataset)?;

        Ok(Self {
            selection: Some(selection),
            revision: self.revision + 1,
            ..self.clone()
        })
    }

    /// Chart to draw for the current state, if a kind and columns are chosen.
    pub fn chart_request(&self) -> Option<ChartRequest> {
        let kind = self.chart?;
        let selection = self.selection.as_ref()?;
        chart_request(kind, selection, &self.dataset).ok()
    }

    pub fn view(&self, preview_rows: usize, dispatcher: &ChartDispatcher) -> SessionView {
        SessionView {
            session_id: self.id,
            filename: self.filename.clone(),
            created_at: self.created_at,
            revision: self.revision,
            columns: self.dataset.columns().to_vec(),
            row_count: self.dataset.row_count(),
            preview: self.dataset.head(preview_rows),
            question: self.question.clone(),
            answer: self.answer.clone(),
            chart: self.chart.map(|kind| ChartPromptView {
                kind,
                prompts: dispatcher.prompts(kind, &self.dataset),
            }),
            selection: self.selection.clone(),
        }
    }
}
