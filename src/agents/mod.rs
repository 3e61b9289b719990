//! Agents
//!
//! - **CSV Agent**: answers questions about one uploaded file through the
//!   configured LLM provider.
//!
//! ```text
//! Upload ──► temp file ──► CsvAgent (model, temperature, path)
//!                              │
//! Question ────────────────────┤
//!                              ▼
//!                        LLM round trip
//!                              │
//!                              ▼
//!                           Answer
//! ```

pub mod csv_agent;

pub use csv_agent::{write_upload, AgentSettings, CsvAgent};
