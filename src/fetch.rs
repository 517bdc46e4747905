use std::path::PathBuf;

use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::PortalConfig;
use crate::models::{RawEvaluation, YearWindow};

/// Supplies raw evaluation records for one school year.
#[async_trait]
pub trait EvaluationSource: Send + Sync {
    async fn fetch(&self, window: &YearWindow) -> anyhow::Result<Vec<RawEvaluation>>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EvaluationsBody {
    List(Vec<RawEvaluation>),
    Page {
        #[serde(default)]
        items: Vec<RawEvaluation>,
    },
}

/// Accepts either a bare JSON array or an object carrying `items`.
pub fn parse_body(body: &[u8]) -> anyhow::Result<Vec<RawEvaluation>> {
    let parsed: EvaluationsBody =
        serde_json::from_slice(body).context("unexpected evaluations payload")?;
    Ok(match parsed {
        EvaluationsBody::List(items) | EvaluationsBody::Page { items } => items,
    })
}

pub fn evaluations_url(subdomain: &str, window: &YearWindow) -> String {
    format!(
        "https://{}.smartschool.be/results/api/v1/evaluations/?pageNumber=1&itemsOnPage=500000&startDate={}&endDate={}",
        subdomain,
        window.start.format("%Y-%m-%d"),
        window.end.format("%Y-%m-%d")
    )
}

pub struct PortalClient {
    http: reqwest::Client,
    config: PortalConfig,
}

impl PortalClient {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl EvaluationSource for PortalClient {
    #[tracing::instrument(skip(self), fields(year = %window.id))]
    async fn fetch(&self, window: &YearWindow) -> anyhow::Result<Vec<RawEvaluation>> {
        let url = evaluations_url(&self.config.subdomain, window);
        info!(%url, "fetching evaluations");

        let mut request = self.http.get(&url).header(ACCEPT, "application/json");
        if let Some(cookie) = &self.config.cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await.context("evaluations request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("API error {}", status.as_u16());
        }

        let body = response.bytes().await?;
        let evaluations = parse_body(&body)?;
        debug!(count = evaluations.len(), "evaluations received");
        Ok(evaluations)
    }
}

/// Reads a saved portal response from disk.
pub struct FileSource {
    pub path: PathBuf,
}

#[async_trait]
impl EvaluationSource for FileSource {
    async fn fetch(&self, _window: &YearWindow) -> anyhow::Result<Vec<RawEvaluation>> {
        let body = std::fs::read(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        parse_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn accepts_array_and_items_bodies() {
        let list = parse_body(br#"[{"identifier": "a", "doesCount": true}]"#).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].identifier, "a");

        let page = parse_body(br#"{"items": [{"identifier": "a"}, {"identifier": "b"}]}"#).unwrap();
        assert_eq!(page.len(), 2);

        let empty = parse_body(br#"{"total": 0}"#).unwrap();
        assert!(empty.is_empty());

        assert!(parse_body(b"<html>login</html>").is_err());
    }

    #[test]
    fn builds_portal_url() {
        let window = YearWindow {
            id: "2025_2026".to_string(),
            label: "2025–2026".to_string(),
            start: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 8, 31).unwrap(),
        };
        assert_eq!(
            evaluations_url("myschool", &window),
            "https://myschool.smartschool.be/results/api/v1/evaluations/?pageNumber=1&itemsOnPage=500000&startDate=2025-09-01&endDate=2026-08-31"
        );
    }
}
