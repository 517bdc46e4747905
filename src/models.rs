use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// One graded item as returned by the portal's results endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvaluation {
    #[serde(default, deserialize_with = "opaque_id")]
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub does_count: bool,
    #[serde(default)]
    pub courses: Vec<CourseRef>,
    #[serde(default)]
    pub graphic: Graphic,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseRef {
    #[serde(default, deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Scoring descriptor attached to a raw evaluation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Graphic {
    #[serde(default)]
    pub value: ScoreValue,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// The `value` of a scoring descriptor, classified once on ingest.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Option<serde_json::Value>")]
pub enum ScoreValue {
    Numeric(f64),
    Text(String),
    #[default]
    Absent,
}

impl From<Option<serde_json::Value>> for ScoreValue {
    fn from(value: Option<serde_json::Value>) -> Self {
        match value {
            Some(serde_json::Value::Number(n)) => n.as_f64().map_or(Self::Absent, Self::Numeric),
            Some(serde_json::Value::String(s)) => Self::Text(s),
            _ => Self::Absent,
        }
    }
}

/// Accepts ids sent either as JSON strings or numbers.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointsPair {
    pub earned: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvaluation {
    pub id: String,
    pub name: String,
    pub date: String,
    pub percent: f64,
    pub description: String,
    pub color: Option<String>,
    pub points_earned: Option<f64>,
    pub points_max: Option<f64>,
}

impl NormalizedEvaluation {
    pub fn points(&self) -> Option<PointsPair> {
        match (self.points_earned, self.points_max) {
            (Some(earned), Some(max)) => Some(PointsPair { earned, max }),
            _ => None,
        }
    }

    /// Earned/max contribution to point-weighted averages.
    pub fn weight(&self) -> (f64, f64) {
        match self.points() {
            Some(points) => (points.earned, points.max),
            None => (self.percent, 100.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStats {
    pub course_id: String,
    pub course_name: String,
    pub evaluations: Vec<NormalizedEvaluation>,
    pub avg_percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub year_percent: f64,
    pub month_percent: f64,
    pub all_time_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub year_id: String,
    pub year_label: String,
    pub courses: Vec<CourseStats>,
    pub global_avg: f64,
    pub analysis: Analysis,
}

/// Start/end dates bounding one school year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearWindow {
    pub id: String,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}
