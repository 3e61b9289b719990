//! CSV Agent
//!
//! Answers natural-language questions about one uploaded file. The agent is
//! built once per upload and addresses the data by the path of a temporary
//! copy of the uploaded bytes; every question is a single request/response
//! round trip to the configured model.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempPath;
use tracing::{debug, info};

use crate::config::Config;
use crate::dataset::Dataset;
use crate::llm::provider::LLM;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};

/// Model settings fixed at construction time.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub context_rows: usize,
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            context_rows: config.data.agent_context_rows,
        }
    }
}

pub struct CsvAgent {
    llm: Arc<LLM>,
    settings: AgentSettings,
    file: TempPath,
    row_count: usize,
    schema: String,
}

/// Write uploaded bytes to a fresh temporary file under `dir`.
/// The file is deleted when the returned path is dropped.
pub fn write_upload(dir: &Path, bytes: &[u8]) -> AppResult<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("ask-csv-")
        .suffix(".csv")
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file.into_temp_path())
}

impl CsvAgent {
    pub fn new(llm: Arc<LLM>, settings: AgentSettings, file: TempPath, dataset: &Dataset) -> Self {
        let schema = dataset
            .columns()
            .iter()
            .map(|c| format!("- {} ({})", c.name, c.kind))
            .collect::<Vec<_>>()
            .join("\n");

        info!(
            path = %file.display(),
            model = %settings.model,
            temperature = settings.temperature,
            "CSV agent created"
        );

        Self {
            llm,
            settings,
            file,
            row_count: dataset.row_count(),
            schema,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Forward one question and return the model's answer verbatim.
    pub async fn ask(&self, question: &str) -> AppResult<String> {
        let bytes = tokio::fs::read(self.path()).await?;
        let (csv_text, shown) = truncate_rows(&bytes, self.settings.context_rows)?;

        let request = LLMRequest {
            model: self.settings.model.clone(),
            messages: vec![LLMMessage::user(self.user_prompt(&csv_text, shown, question))],
            max_tokens: self.settings.max_tokens,
            temperature: Some(self.settings.temperature),
            system_instruction: Some(self.system_instruction()),
        };

        debug!(question_len = question.len(), rows_shown = shown, "Asking CSV agent");
        let response = self.llm.create_chat_completion(&request).await?;
        info!(
            answer_len = response.content.len(),
            total_tokens = response.usage.total_tokens,
            "CSV agent answered"
        );

        Ok(response.content)
    }

    fn system_instruction(&self) -> String {
        format!(
            "You are a data analyst working with the CSV file at {}.\n\
             It has {} data rows and these columns:\n{}\n\n\
             Answer the user's question using only this data. If the data \
             does not contain the answer, say so. Keep answers concise and \
             show the numbers you relied on.",
            self.file.display(),
            self.row_count,
            self.schema
        )
    }

    fn user_prompt(&self, csv_text: &str, shown: usize, question: &str) -> String {
        let note = if shown < self.row_count {
            format!(" (first {} of {} rows)", shown, self.row_count)
        } else {
            String::new()
        };
        format!(
            "Data{}:\n```csv\n{}```\n\nQuestion: {}",
            note, csv_text, question
        )
    }
}

/// Keep the header and at most `max_rows` data records. Returns the CSV
/// text and the number of data records kept.
fn truncate_rows(bytes: &[u8], max_rows: usize) -> AppResult<(String, usize)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    let mut kept = 0;
    for (idx, record) in rdr.byte_records().enumerate() {
        if idx > max_rows {
            break;
        }
        let record = record
            .map_err(|e| AppError::InvalidRequest(format!("Malformed CSV: {}", e)))?;
        wtr.write_byte_record(&record)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if idx > 0 {
            kept += 1;
        }
    }

    let data = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok((String::from_utf8_lossy(&data).into_owned(), kept))
}
