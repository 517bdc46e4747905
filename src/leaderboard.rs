use serde::Serialize;

use crate::models::StatsReport;

pub const LEADERBOARD_URL: &str =
    "https://superman2775.github.io/smartschool-results-leaderboard/website/index.html";
pub const LEADERBOARD_ORIGIN: &str = "https://superman2775.github.io";
pub const MESSAGE_TYPE: &str = "smartschool-leaderboard-data";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPayload {
    pub year_id: String,
    pub year_label: String,
    pub global_avg: f64,
    pub courses: Vec<LeaderboardCourse>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardCourse {
    pub id: String,
    pub name: String,
    pub avg_percent: f64,
    pub evaluations: Vec<LeaderboardEvaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEvaluation {
    pub id: String,
    pub name: String,
    pub date: String,
    pub percent: f64,
    pub color: Option<String>,
    pub description: String,
}

/// Envelope posted to the leaderboard page.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub payload: LeaderboardPayload,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Reduces a report to what the leaderboard page displays.
pub fn build_payload(report: &StatsReport) -> LeaderboardPayload {
    let courses = report
        .courses
        .iter()
        .map(|course| LeaderboardCourse {
            id: course.course_id.clone(),
            name: course.course_name.clone(),
            avg_percent: round2(course.avg_percent),
            evaluations: course
                .evaluations
                .iter()
                .map(|e| LeaderboardEvaluation {
                    id: e.id.clone(),
                    name: e.name.clone(),
                    date: e.date.clone(),
                    percent: round2(e.percent),
                    color: e.color.clone(),
                    description: e.description.clone(),
                })
                .collect(),
        })
        .collect();

    LeaderboardPayload {
        year_id: report.year_id.clone(),
        year_label: report.year_label.clone(),
        global_avg: round2(report.global_avg),
        courses,
    }
}

pub fn message(report: &StatsReport) -> LeaderboardMessage {
    LeaderboardMessage {
        kind: MESSAGE_TYPE,
        payload: build_payload(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Analysis, CourseStats, NormalizedEvaluation};

    fn sample_report() -> StatsReport {
        StatsReport {
            year_id: "2025_2026".to_string(),
            year_label: "2025–2026".to_string(),
            courses: vec![
                CourseStats {
                    course_id: "12".to_string(),
                    course_name: "Wiskunde".to_string(),
                    evaluations: vec![NormalizedEvaluation {
                        id: "e1".to_string(),
                        name: "Toets 1".to_string(),
                        date: "2025-10-02T10:00:00+02:00".to_string(),
                        percent: 76.666666,
                        description: "23 / 30".to_string(),
                        color: Some("green".to_string()),
                        points_earned: Some(23.0),
                        points_max: Some(30.0),
                    }],
                    avg_percent: 76.666666,
                },
                CourseStats {
                    course_id: "7".to_string(),
                    course_name: "Frans".to_string(),
                    evaluations: vec![NormalizedEvaluation {
                        id: "e2".to_string(),
                        name: "Dictee".to_string(),
                        date: "2025-10-03".to_string(),
                        percent: 55.0,
                        description: String::new(),
                        color: None,
                        points_earned: None,
                        points_max: None,
                    }],
                    avg_percent: 55.0,
                },
            ],
            global_avg: 66.12345,
            analysis: Analysis::default(),
        }
    }

    #[test]
    fn rounds_percentages_to_two_decimals() {
        let payload = build_payload(&sample_report());
        assert_eq!(payload.global_avg, 66.12);
        assert_eq!(payload.courses[0].avg_percent, 76.67);
        assert_eq!(payload.courses[0].evaluations[0].percent, 76.67);
    }

    #[test]
    fn keeps_course_order_and_drops_points() {
        let payload = build_payload(&sample_report());
        let ids: Vec<&str> = payload.courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["12", "7"]);

        let json = serde_json::to_value(&payload).unwrap();
        let evaluation = &json["courses"][0]["evaluations"][0];
        assert!(evaluation.get("pointsEarned").is_none());
        assert_eq!(evaluation["description"], "23 / 30");
        assert_eq!(json["courses"][1]["evaluations"][0]["color"], serde_json::Value::Null);
        assert_eq!(json["yearId"], "2025_2026");
    }

    #[test]
    fn message_carries_type_tag() {
        let json = serde_json::to_value(message(&sample_report())).unwrap();
        assert_eq!(json["type"], MESSAGE_TYPE);
        assert_eq!(json["payload"]["globalAvg"], 66.12);
    }
}
