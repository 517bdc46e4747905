use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::models::{
    Analysis, CourseStats, NormalizedEvaluation, PointsPair, RawEvaluation, ScoreValue,
    StatsReport, YearWindow,
};

static POINTS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9.,]+)\s*/\s*([0-9.,]+)").expect("points pattern is a valid regex")
});

/// Extracts an "EARNED / MAX" pair from free text, accepting `,` or `.` decimals.
pub fn parse_points(description: &str) -> Option<PointsPair> {
    let captures = POINTS_PATTERN.captures(description)?;
    let earned = parse_decimal(captures.get(1)?.as_str())?;
    let max = parse_decimal(captures.get(2)?.as_str())?;
    if max <= 0.0 {
        return None;
    }
    Some(PointsPair { earned, max })
}

/// Reads the longest leading decimal number after turning the first `,` into `.`.
fn parse_decimal(raw: &str) -> Option<f64> {
    let text = raw.replacen(',', ".", 1);
    let mut end = 0;
    let mut seen_dot = false;
    for (idx, ch) in text.char_indices() {
        match ch {
            '0'..='9' => end = idx + 1,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
    }
    text[..end].parse::<f64>().ok()
}

/// Normalizes one evaluation's score, or `None` when it carries no usable score.
pub fn normalize(raw: &RawEvaluation) -> Option<NormalizedEvaluation> {
    let graphic = &raw.graphic;
    let description = graphic.description.clone().unwrap_or_default();

    let numeric = match graphic.value {
        ScoreValue::Numeric(value) if graphic.kind.as_deref() != Some("text") => Some(value),
        _ => None,
    };

    let (percent, points) = match (numeric, parse_points(&description)) {
        (Some(value), _) => (value, None),
        (None, Some(points)) => (points.earned / points.max * 100.0, Some(points)),
        (None, None) => return None,
    };

    Some(NormalizedEvaluation {
        id: raw.identifier.clone(),
        name: raw.name.clone(),
        date: raw.date.clone(),
        percent,
        description,
        color: graphic.color.clone(),
        points_earned: points.map(|p| p.earned),
        points_max: points.map(|p| p.max),
    })
}

fn counts(raw: &RawEvaluation) -> bool {
    raw.does_count && !raw.courses.is_empty()
}

/// Groups countable evaluations by their first course, best average first.
pub fn build_courses(raw: &[RawEvaluation]) -> Vec<CourseStats> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut courses: Vec<CourseStats> = Vec::new();

    for evaluation in raw.iter().filter(|ev| counts(ev)) {
        let course = &evaluation.courses[0];
        let slot = *index.entry(course.id.as_str()).or_insert_with(|| {
            courses.push(CourseStats {
                course_id: course.id.clone(),
                course_name: course.name.clone(),
                evaluations: Vec::new(),
                avg_percent: 0.0,
            });
            courses.len() - 1
        });

        if let Some(normalized) = normalize(evaluation) {
            courses[slot].evaluations.push(normalized);
        }
    }

    courses.retain(|course| !course.evaluations.is_empty());
    for course in courses.iter_mut() {
        let total: f64 = course.evaluations.iter().map(|e| e.percent).sum();
        course.avg_percent = total / course.evaluations.len() as f64;
    }

    // sort_by is stable: ties keep discovery order
    courses.sort_by(|a, b| {
        b.avg_percent
            .partial_cmp(&a.avg_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    courses
}

fn weighted_percent(sum: f64, max: f64) -> f64 {
    if max > 0.0 {
        sum / max * 100.0
    } else {
        0.0
    }
}

/// Point-weighted average over every evaluation of every course.
pub fn global_average(courses: &[CourseStats]) -> f64 {
    let (earned, max) = courses
        .iter()
        .flat_map(|course| course.evaluations.iter())
        .map(NormalizedEvaluation::weight)
        .fold((0.0, 0.0), |(s, m), (e, x)| (s + e, m + x));
    weighted_percent(earned, max)
}

/// Parses the portal's date strings into local wall-clock time.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

#[derive(Debug, Default)]
struct Bucket {
    sum: f64,
    max: f64,
}

impl Bucket {
    fn add(&mut self, (earned, max): (f64, f64)) {
        self.sum += earned;
        self.max += max;
    }

    fn percent(&self) -> f64 {
        weighted_percent(self.sum, self.max)
    }
}

/// Earned/max for the time windows: a parseable points description counts
/// even when a numeric value set the evaluation's percent.
fn window_weight(normalized: &NormalizedEvaluation) -> (f64, f64) {
    match parse_points(&normalized.description) {
        Some(points) => (points.earned, points.max),
        None => (normalized.percent, 100.0),
    }
}

/// Point-weighted averages for the school year, the month of `now`, and all time.
pub fn analyze_windows(raw: &[RawEvaluation], window: &YearWindow, now: NaiveDateTime) -> Analysis {
    let year_start = window.start.and_time(NaiveTime::MIN);
    let year_end = NaiveTime::from_hms_opt(23, 59, 59).map(|t| window.end.and_time(t));

    let mut year = Bucket::default();
    let mut month = Bucket::default();
    let mut all_time = Bucket::default();

    for normalized in raw.iter().filter(|ev| counts(ev)).filter_map(normalize) {
        let weight = window_weight(&normalized);
        all_time.add(weight);

        let Some(date) = parse_date(&normalized.date) else {
            continue;
        };
        if date >= year_start && year_end.is_some_and(|end| date <= end) {
            year.add(weight);
        }
        if date.year() == now.year() && date.month() == now.month() {
            month.add(weight);
        }
    }

    Analysis {
        year_percent: year.percent(),
        month_percent: month.percent(),
        all_time_percent: all_time.percent(),
    }
}

/// Builds the full statistics report for one school year.
pub fn aggregate(raw: &[RawEvaluation], window: &YearWindow, now: NaiveDateTime) -> StatsReport {
    let courses = build_courses(raw);
    let global_avg = global_average(&courses);
    let analysis = analyze_windows(raw, window, now);

    StatsReport {
        year_id: window.id.clone(),
        year_label: window.label.clone(),
        courses,
        global_avg,
        analysis,
    }
}
