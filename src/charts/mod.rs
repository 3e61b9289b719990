//! Chart dispatch
//!
//! A question picks at most one chart kind by keyword. Dispatch is gated
//! twice: the question must contain a trigger word (`plot` or
//! `visualization`), and then the first chart keyword found in the fixed
//! order bar → line → histogram → pie wins. Matching is plain substring
//! search on the lowercased question, so "pipeline" counts as "line".
//!
//! Once a kind is selected the user picks column(s) from the dataset's own
//! column list and the [`ChartDispatcher`] hands a titled [`ChartRequest`]
//! to a [`ChartRenderer`].

pub mod data;
pub mod render;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::Dataset;
use crate::types::{AppError, AppResult};

pub use render::PlottersRenderer;

pub const TRIGGER_WORDS: [&str; 2] = ["plot", "visualization"];

/// Keyword check order; the first hit is the only kind selected.
pub const CHART_PRIORITY: [ChartKind; 4] = [
    ChartKind::Bar,
    ChartKind::Line,
    ChartKind::Histogram,
    ChartKind::Pie,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Histogram,
    Pie,
}

impl ChartKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Histogram => "histogram",
            ChartKind::Pie => "pie",
        }
    }

    /// Number of columns the user has to pick.
    pub fn column_count(self) -> usize {
        match self {
            ChartKind::Line => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

pub fn is_chart_requested(question: &str) -> bool {
    let lowered = question.to_lowercase();
    TRIGGER_WORDS.iter().any(|w| lowered.contains(w))
}

pub fn chart_kind_for(question: &str) -> Option<ChartKind> {
    let lowered = question.to_lowercase();
    CHART_PRIORITY
        .iter()
        .copied()
        .find(|kind| lowered.contains(kind.keyword()))
}

/// Both gates: trigger word first, then chart keyword.
pub fn select_chart(question: &str) -> Option<ChartKind> {
    if !is_chart_requested(question) {
        return None;
    }
    chart_kind_for(question)
}

/// Column choice(s) made by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSelection {
    Pair { x: String, y: String },
    Single { column: String },
}

impl ColumnSelection {
    pub fn single(column: impl Into<String>) -> Self {
        ColumnSelection::Single {
            column: column.into(),
        }
    }

    pub fn pair(x: impl Into<String>, y: impl Into<String>) -> Self {
        ColumnSelection::Pair {
            x: x.into(),
            y: y.into(),
        }
    }

    pub fn columns(&self) -> Vec<&str> {
        match self {
            ColumnSelection::Single { column } => vec![column.as_str()],
            ColumnSelection::Pair { x, y } => vec![x.as_str(), y.as_str()],
        }
    }
}

/// One column dropdown offered to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnPrompt {
    pub key: &'static str,
    pub label: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub selection: ColumnSelection,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedChart {
    pub kind: ChartKind,
    pub title: String,
    pub format: String,
    pub body: String,
}

/// Plotting collaborator.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, dataset: &Dataset, request: &ChartRequest) -> AppResult<RenderedChart>;
}

pub fn chart_title(kind: ChartKind, selection: &ColumnSelection) -> String {
    match (kind, selection) {
        (ChartKind::Line, ColumnSelection::Pair { x, y }) => {
            format!("Line Plot of {} over {}", y, x)
        }
        (ChartKind::Bar, ColumnSelection::Single { column }) => {
            format!("Bar Plot of Top 5 Rows by {}", column)
        }
        (ChartKind::Histogram, ColumnSelection::Single { column }) => {
            format!("Histogram of {}", column)
        }
        (ChartKind::Pie, ColumnSelection::Single { column }) => {
            format!("Pie Chart of {}", column)
        }
        (kind, selection) => format!("{} of {}", kind, selection.columns().join(", ")),
    }
}

/// Check a selection against the chart kind and the dataset and build the
/// titled request.
pub fn chart_request(
    kind: ChartKind,
    selection: &ColumnSelection,
    dataset: &Dataset,
) -> AppResult<ChartRequest> {
    let columns = selection.columns();
    if columns.len() != kind.column_count() {
        return Err(AppError::InvalidRequest(match kind {
            ChartKind::Line => "a line plot needs an x and a y column".to_string(),
            other => format!("a {} chart needs exactly one column", other),
        }));
    }

    if let Some(unknown) = columns.iter().find(|c| dataset.column(c).is_none()) {
        return Err(AppError::InvalidRequest(format!(
            "'{}' is not a column of the uploaded data",
            unknown
        )));
    }

    Ok(ChartRequest {
        kind,
        title: chart_title(kind, selection),
        selection: selection.clone(),
    })
}

#[derive(Clone)]
pub struct ChartDispatcher {
    renderer: Arc<dyn ChartRenderer>,
}

impl ChartDispatcher {
    pub fn new(renderer: Arc<dyn ChartRenderer>) -> Self {
        Self { renderer }
    }

    /// Dropdowns for the chart kind, limited to the dataset's columns.
    pub fn prompts(&self, kind: ChartKind, dataset: &Dataset) -> Vec<ColumnPrompt> {
        let options = dataset.column_names();
        let prompt = |key: &'static str, label: &str| ColumnPrompt {
            key,
            label: label.to_string(),
            options: options.clone(),
        };

        match kind {
            ChartKind::Bar => vec![prompt("column", "Select the column for the bar plot:")],
            ChartKind::Line => vec![
                prompt("x", "Select the X-axis column for the line plot:"),
                prompt("y", "Select the Y-axis column for the line plot:"),
            ],
            ChartKind::Histogram => vec![prompt("column", "Select the column for the histogram:")],
            ChartKind::Pie => vec![prompt("column", "Select the column for the pie chart:")],
        }
    }

    pub fn request(
        &self,
        kind: ChartKind,
        selection: &ColumnSelection,
        dataset: &Dataset,
    ) -> AppResult<ChartRequest> {
        chart_request(kind, selection, dataset)
    }

    pub fn render(
        &self,
        kind: ChartKind,
        selection: &ColumnSelection,
        dataset: &Dataset,
    ) -> AppResult<RenderedChart> {
        let request = self.request(kind, selection, dataset)?;
        info!(kind = %request.kind, title = %request.title, "Rendering chart");
        self.renderer.render(dataset, &request)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Renderer that records every request it receives.
    #[derive(Default)]
    pub(crate) struct RecordingRenderer {
        pub calls: Mutex<Vec<ChartRequest>>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(&self, _dataset: &Dataset, request: &ChartRequest) -> AppResult<RenderedChart> {
            self.calls.lock().unwrap().push(request.clone());
            Ok(RenderedChart {
                kind: request.kind,
                title: request.title.clone(),
                format: "svg".to_string(),
                body: "<svg/>".to_string(),
            })
        }
    }

    fn dataset() -> Dataset {
        Dataset::from_csv_bytes(b"A,B\n1,x\n2,y\n3,x\n").unwrap()
    }

    #[test]
    fn test_no_keyword_selects_nothing() {
        assert_eq!(select_chart("Plot the data please"), None);
        assert_eq!(select_chart("What is the average?"), None);
        assert_eq!(chart_kind_for("how many rows"), None);
    }

    #[test]
    fn test_trigger_word_is_required() {
        assert_eq!(chart_kind_for("show me a pie"), Some(ChartKind::Pie));
        assert_eq!(select_chart("show me a pie"), None);
        assert_eq!(select_chart("pie VISUALIZATION"), Some(ChartKind::Pie));
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(select_chart("plot a line and a bar"), Some(ChartKind::Bar));
        assert_eq!(select_chart("plot a pie or a histogram"), Some(ChartKind::Histogram));
        assert_eq!(select_chart("plot a pie or a line"), Some(ChartKind::Line));
    }

    #[test]
    fn test_substring_matching_is_loose() {
        // "pipeline" contains "line"
        assert_eq!(select_chart("plot the pipeline stages"), Some(ChartKind::Line));
    }

    #[test]
    fn test_prompts_follow_kind() {
        let dispatcher = ChartDispatcher::new(Arc::new(RecordingRenderer::default()));
        let data = dataset();

        let line = dispatcher.prompts(ChartKind::Line, &data);
        assert_eq!(line.iter().map(|p| p.key).collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(line[0].options, vec!["A", "B"]);

        let pie = dispatcher.prompts(ChartKind::Pie, &data);
        assert_eq!(pie.len(), 1);
        assert_eq!(pie[0].label, "Select the column for the pie chart:");
    }

    #[test]
    fn test_pie_selection_reaches_renderer() {
        let renderer = Arc::new(RecordingRenderer::default());
        let dispatcher = ChartDispatcher::new(renderer.clone());
        let kind = select_chart("Make a pie plot").unwrap();

        let chart = dispatcher
            .render(kind, &ColumnSelection::single("B"), &dataset())
            .unwrap();

        let calls = renderer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].kind, ChartKind::Pie);
        assert_eq!(calls[0].selection, ColumnSelection::single("B"));
        assert!(chart.title.contains("Pie"));
        assert!(chart.title.contains('B'));
    }

    #[test]
    fn test_rejects_unknown_columns() {
        let renderer = Arc::new(RecordingRenderer::default());
        let dispatcher = ChartDispatcher::new(renderer.clone());

        let err = dispatcher
            .render(ChartKind::Bar, &ColumnSelection::single("C"), &dataset())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert!(renderer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_wrong_arity() {
        let dispatcher = ChartDispatcher::new(Arc::new(RecordingRenderer::default()));
        let data = dataset();

        assert!(dispatcher
            .request(ChartKind::Line, &ColumnSelection::single("A"), &data)
            .is_err());
        assert!(dispatcher
            .request(ChartKind::Pie, &ColumnSelection::pair("A", "B"), &data)
            .is_err());
    }

    #[test]
    fn test_titles() {
        assert_eq!(
            chart_title(ChartKind::Line, &ColumnSelection::pair("year", "rating")),
            "Line Plot of rating over year"
        );
        assert_eq!(
            chart_title(ChartKind::Histogram, &ColumnSelection::single("rating")),
            "Histogram of rating"
        );
        assert_eq!(
            chart_title(ChartKind::Bar, &ColumnSelection::single("rating")),
            "Bar Plot of Top 5 Rows by rating"
        );
    }

    #[test]
    fn test_selection_json_shapes() {
        let single: ColumnSelection = serde_json::from_str(r#"{"column":"B"}"#).unwrap();
        assert_eq!(single, ColumnSelection::single("B"));
        let pair: ColumnSelection = serde_json::from_str(r#"{"x":"A","y":"B"}"#).unwrap();
        assert_eq!(pair, ColumnSelection::pair("A", "B"));
    }
}
