use chrono::NaiveDateTime;
use tracing::info;

use crate::db::ReportCache;
use crate::fetch::EvaluationSource;
use crate::models::{StatsReport, YearWindow};
use crate::stats;

/// Fetches fresh records, aggregates them and overwrites the cache.
pub async fn refresh(
    source: &dyn EvaluationSource,
    cache: &dyn ReportCache,
    window: &YearWindow,
    now: NaiveDateTime,
) -> anyhow::Result<StatsReport> {
    let raw = source.fetch(window).await?;
    let report = stats::aggregate(&raw, window, now);
    cache.store(&report).await?;

    info!(
        year = %report.year_id,
        records = raw.len(),
        courses = report.courses.len(),
        global_avg = report.global_avg,
        "refreshed report"
    );
    Ok(report)
}

/// Returns the cached report when it covers `window`, otherwise refreshes.
///
/// The source is only opened on a miss, so a warm cache needs no portal settings.
pub async fn load_or_refresh<F>(
    open_source: F,
    cache: &dyn ReportCache,
    window: &YearWindow,
    now: NaiveDateTime,
) -> anyhow::Result<StatsReport>
where
    F: FnOnce() -> anyhow::Result<Box<dyn EvaluationSource>>,
{
    match cache.load().await? {
        Some(report) if report.year_id == window.id => {
            info!(year = %report.year_id, "using cached report");
            return Ok(report);
        }
        Some(report) => {
            info!(
                cached = %report.year_id,
                requested = %window.id,
                "cached report is for another year"
            );
        }
        None => {}
    }
    let source = open_source()?;
    refresh(source.as_ref(), cache, window, now).await
}
