use std::fmt::Write;

use crate::models::StatsReport;

const BAR_WIDTH: usize = 40;
const UNKNOWN_COLOR: &str = "#CCCCCC";

pub fn grade_class(percent: f64) -> &'static str {
    if percent >= 80.0 {
        "good"
    } else if percent >= 60.0 {
        "ok"
    } else {
        "bad"
    }
}

pub fn color_hex(color: Option<&str>) -> &'static str {
    match color {
        Some("green") => "#80dba6",
        Some("yellow") => "#f1c40f",
        Some("red") => "#e74c3c",
        Some("olive") => "#3aa10b",
        Some("steel") => "#95a5a6",
        Some("orange") => "#e67e22",
        _ => UNKNOWN_COLOR,
    }
}

/// Text progress bar; only the drawing is clamped to 0–100.
fn progress_bar(percent: f64) -> String {
    let clamped = percent.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn render_panel(report: &StatsReport) -> String {
    let mut output = String::new();

    if report.courses.is_empty() {
        let _ = writeln!(output, "No grades found for this school year.");
        return output;
    }

    let label = if report.year_label.is_empty() {
        "school year"
    } else {
        report.year_label.as_str()
    };

    let _ = writeln!(output, "# Grades ({})", label);
    let _ = writeln!(
        output,
        "Global: {:.2}% ({})",
        report.global_avg,
        grade_class(report.global_avg)
    );
    let _ = writeln!(
        output,
        "0% {} 100%",
        progress_bar(report.global_avg)
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "This year: {:.1}% | This month: {:.1}% | All-time: {:.1}%",
        report.analysis.year_percent,
        report.analysis.month_percent,
        report.analysis.all_time_percent
    );

    for course in report.courses.iter() {
        let name = if course.course_name.is_empty() {
            "Unknown course"
        } else {
            course.course_name.as_str()
        };

        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "## {} | {:.1}% ({})",
            name,
            course.avg_percent,
            grade_class(course.avg_percent)
        );

        for evaluation in course.evaluations.iter() {
            let _ = writeln!(
                output,
                "- [{}] {}: {}% ({})",
                color_hex(evaluation.color.as_deref()),
                evaluation.name,
                evaluation.percent,
                evaluation.description
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Analysis, CourseStats, NormalizedEvaluation};

    fn report_with(global_avg: f64, courses: Vec<CourseStats>) -> StatsReport {
        StatsReport {
            year_id: "2025_2026".to_string(),
            year_label: "2025–2026".to_string(),
            courses,
            global_avg,
            analysis: Analysis {
                year_percent: 71.24,
                month_percent: 80.0,
                all_time_percent: 71.24,
            },
        }
    }

    fn course(name: &str, percent: f64, color: Option<&str>) -> CourseStats {
        CourseStats {
            course_id: name.to_lowercase(),
            course_name: name.to_string(),
            evaluations: vec![NormalizedEvaluation {
                id: "1".to_string(),
                name: "Test".to_string(),
                date: "2025-10-01".to_string(),
                percent,
                description: "17 / 20".to_string(),
                color: color.map(str::to_string),
                points_earned: Some(17.0),
                points_max: Some(20.0),
            }],
            avg_percent: percent,
        }
    }

    #[test]
    fn grade_classes_follow_thresholds() {
        assert_eq!(grade_class(80.0), "good");
        assert_eq!(grade_class(79.9), "ok");
        assert_eq!(grade_class(60.0), "ok");
        assert_eq!(grade_class(59.9), "bad");
    }

    #[test]
    fn unknown_colors_fall_back_to_grey() {
        assert_eq!(color_hex(Some("green")), "#80dba6");
        assert_eq!(color_hex(Some("purple")), UNKNOWN_COLOR);
        assert_eq!(color_hex(None), UNKNOWN_COLOR);
    }

    #[test]
    fn empty_report_shows_no_data_state() {
        let rendered = render_panel(&report_with(0.0, Vec::new()));
        assert_eq!(rendered, "No grades found for this school year.\n");
    }

    #[test]
    fn bar_is_clamped_but_value_is_not() {
        let rendered = render_panel(&report_with(112.5, vec![course("Sport", 112.5, None)]));
        assert!(rendered.contains("Global: 112.50% (good)"));
        assert!(rendered.contains(&format!("[{}]", "#".repeat(BAR_WIDTH))));

        let rendered = render_panel(&report_with(-5.0, vec![course("Sport", -5.0, None)]));
        assert!(rendered.contains(&format!("[{}]", "-".repeat(BAR_WIDTH))));
    }

    #[test]
    fn renders_courses_and_analysis() {
        let rendered = render_panel(&report_with(
            85.0,
            vec![course("Wiskunde", 85.0, Some("green"))],
        ));
        assert!(rendered.starts_with("# Grades (2025–2026)\n"));
        assert!(rendered.contains("This year: 71.2% | This month: 80.0% | All-time: 71.2%"));
        assert!(rendered.contains("## Wiskunde | 85.0% (good)"));
        assert!(rendered.contains("- [#80dba6] Test: 85% (17 / 20)"));
    }
}
