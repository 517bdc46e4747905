use anyhow::{bail, Context};
use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::models::YearWindow;

/// School years known to the tool, newest first.
const SCHOOL_YEARS: &[(&str, &str, &str, &str)] = &[
    ("2025_2026", "2025–2026", "2025-09-01", "2026-08-31"),
    ("2024_2025", "2024–2025", "2024-09-01", "2025-08-31"),
];

pub fn school_years() -> anyhow::Result<Vec<YearWindow>> {
    SCHOOL_YEARS
        .iter()
        .map(|(id, label, start, end)| -> anyhow::Result<YearWindow> {
            Ok(YearWindow {
                id: id.to_string(),
                label: label.to_string(),
                start: NaiveDate::parse_from_str(start, "%Y-%m-%d")
                    .with_context(|| format!("invalid start date for {id}"))?,
                end: NaiveDate::parse_from_str(end, "%Y-%m-%d")
                    .with_context(|| format!("invalid end date for {id}"))?,
            })
        })
        .collect()
}

/// Looks up a school year by id, defaulting to the newest one.
pub fn year_window(id: Option<&str>) -> anyhow::Result<YearWindow> {
    let years = school_years()?;
    match id {
        None => years.into_iter().next().context("no school years configured"),
        Some(wanted) => match years.into_iter().find(|year| year.id == wanted) {
            Some(year) => Ok(year),
            None => bail!("unknown school year {wanted}"),
        },
    }
}

/// Resolves the reference instant for month windows.
pub fn reference_now(raw: Option<&str>) -> anyhow::Result<NaiveDateTime> {
    match raw {
        None => Ok(Local::now().naive_local()),
        Some(value) => crate::stats::parse_date(value)
            .with_context(|| format!("could not parse --now value {value}")),
    }
}

/// Connection settings for the school portal.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub subdomain: String,
    pub cookie: Option<String>,
}

impl PortalConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let subdomain = std::env::var("SMARTSCHOOL_SUBDOMAIN")
            .context("SMARTSCHOOL_SUBDOMAIN must be set to the school's portal subdomain")?;
        let cookie = std::env::var("SMARTSCHOOL_COOKIE").ok();
        Ok(Self { subdomain, cookie })
    }
}
