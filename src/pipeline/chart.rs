//! Result-shape classification into a Chart.js style configuration.
//!
//! Classification is a first-match walk over [`RULE_ORDER`]. The order is
//! part of the contract: a `COUNT ... GROUP BY` query is a bar chart even
//! when it also sums something.

use crate::db::ResultSet;
use crate::error::Result;
use serde::Serialize;

const DEFAULT_LABEL: &str = "Data";
const DEFAULT_BACKGROUND: &str = "rgba(75, 192, 192, 0.6)";
const LINE_BORDER: &str = "rgba(255, 99, 132, 1)";
const LINE_TENSION: f64 = 0.4;
const TITLE: &str = "Query Results";

pub const DOUGHNUT_PALETTE: [&str; 6] = [
    "rgba(255, 99, 132, 0.8)",
    "rgba(54, 162, 235, 0.8)",
    "rgba(255, 206, 86, 0.8)",
    "rgba(75, 192, 192, 0.8)",
    "rgba(153, 102, 255, 0.8)",
    "rgba(255, 159, 64, 0.8)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Doughnut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Background {
    Single(&'static str),
    Palette(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: &'static str,
    pub data: Vec<f64>,
    pub background_color: Background,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartTitle {
    pub display: bool,
    pub text: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPlugins {
    pub title: ChartTitle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    pub plugins: ChartPlugins,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: ChartOptions,
}

impl Default for ChartSpec {
    fn default() -> Self {
        Self {
            kind: ChartKind::Bar,
            data: ChartData {
                labels: Vec::new(),
                datasets: vec![Dataset {
                    label: DEFAULT_LABEL,
                    data: Vec::new(),
                    background_color: Background::Single(DEFAULT_BACKGROUND),
                    border_color: None,
                    tension: None,
                }],
            },
            options: ChartOptions {
                plugins: ChartPlugins {
                    title: ChartTitle {
                        display: true,
                        text: TITLE,
                    },
                },
            },
        }
    }
}

impl ChartSpec {
    fn dataset_mut(&mut self) -> &mut Dataset {
        // The default spec always carries exactly one dataset
        &mut self.data.datasets[0]
    }

    fn fill(&mut self, labels: Vec<String>, data: Vec<f64>) {
        self.data.labels = labels;
        self.dataset_mut().data = data;
    }
}

/// Which shape a result is drawn as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartRule {
    /// No rows: default empty bar chart.
    Empty,
    /// Query counts per group: bar chart of counts.
    CountByGroup,
    /// Query averages or sums: smoothed line chart.
    Aggregate,
    /// Any other two-column result: doughnut.
    TwoColumn,
    /// Nothing recognisable: default shape, no data.
    Fallback,
}

pub const RULE_ORDER: [ChartRule; 5] = [
    ChartRule::Empty,
    ChartRule::CountByGroup,
    ChartRule::Aggregate,
    ChartRule::TwoColumn,
    ChartRule::Fallback,
];

impl ChartRule {
    /// `query_upper` must already be upper-cased.
    fn matches(self, result: &ResultSet, query_upper: &str) -> bool {
        match self {
            ChartRule::Empty => result.is_empty(),
            ChartRule::CountByGroup => {
                query_upper.contains("COUNT") && query_upper.contains("GROUP BY")
            }
            ChartRule::Aggregate => query_upper.contains("AVG") || query_upper.contains("SUM"),
            ChartRule::TwoColumn => result.rows.first().is_some_and(|row| row.len() == 2),
            ChartRule::Fallback => true,
        }
    }
}

pub fn classify(result: &ResultSet, query_text: &str) -> ChartRule {
    let query_upper = query_text.to_uppercase();
    RULE_ORDER
        .into_iter()
        .find(|rule| rule.matches(result, &query_upper))
        .unwrap_or(ChartRule::Fallback)
}

/// Builds the chart for `result`, using `query_text` only for keyword checks.
///
/// Rows with fewer than two columns are skipped by every rule. A measure
/// that is not numeric fails the whole transform.
pub fn to_chart_spec(result: &ResultSet, query_text: &str) -> Result<ChartSpec> {
    let mut spec = ChartSpec::default();

    match classify(result, query_text) {
        ChartRule::Empty | ChartRule::Fallback => {}
        ChartRule::CountByGroup => {
            let (labels, data) = labelled_points(result)?;
            spec.kind = ChartKind::Bar;
            spec.fill(labels, data);
            spec.dataset_mut().label = "Count";
        }
        ChartRule::Aggregate => {
            let (labels, data) = labelled_points(result)?;
            spec.kind = ChartKind::Line;
            spec.fill(labels, data);
            let dataset = spec.dataset_mut();
            dataset.label = "Value";
            dataset.border_color = Some(LINE_BORDER);
            dataset.tension = Some(LINE_TENSION);
        }
        ChartRule::TwoColumn => {
            let (labels, data) = labelled_points(result)?;
            spec.kind = ChartKind::Doughnut;
            spec.fill(labels, data);
            spec.dataset_mut().background_color = Background::Palette(DOUGHNUT_PALETTE.to_vec());
        }
    }

    Ok(spec)
}

/// `row[0]` as label, `row[1]` as measure.
fn labelled_points(result: &ResultSet) -> Result<(Vec<String>, Vec<f64>)> {
    let mut labels = Vec::with_capacity(result.len());
    let mut data = Vec::with_capacity(result.len());

    for row in result.rows.iter().filter(|row| row.len() >= 2) {
        let value = row[1].to_f64()?;
        labels.push(row[0].to_label());
        data.push(value);
    }

    Ok((labels, data))
}
