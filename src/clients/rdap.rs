//! Domain registration age over RDAP

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::clients::traits::DomainInspector;

#[derive(Debug, Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    action: String,
    #[serde(rename = "eventDate")]
    date: String,
}

#[derive(Debug, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
}

/// Registration date from the `registration` event
fn registration_date(body: &RdapDomain) -> Result<DateTime<Utc>> {
    let event = body
        .events
        .iter()
        .find(|e| e.action.eq_ignore_ascii_case("registration"))
        .context("RDAP response has no registration event")?;
    let parsed = DateTime::parse_from_rfc3339(&event.date)
        .with_context(|| format!("Unparseable registration date '{}'", event.date))?;
    Ok(parsed.with_timezone(&Utc))
}

fn age_in_days(registered: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - registered).num_days().max(0) as u64
}

pub struct RdapInspector {
    http: Client,
    base_url: String,
}

impl RdapInspector {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("Failed to build reqwest client for RDAP")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DomainInspector for RdapInspector {
    async fn age_days(&self, domain: &str) -> Result<u64> {
        let url = format!("{}/{}", self.base_url, domain);
        let body: RdapDomain = self
            .http
            .get(&url)
            .header("Accept", "application/rdap+json")
            .send()
            .await
            .context("RDAP request failed")?
            .error_for_status()
            .context("RDAP lookup rejected")?
            .json()
            .await
            .context("Failed to parse RDAP response")?;
        let registered = registration_date(&body)?;
        let days = age_in_days(registered, Utc::now());
        debug!("{} registered {} ({} days)", domain, registered, days);
        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_event_is_found_and_aged() {
        let raw = r#"{"events":[
            {"eventAction":"last changed","eventDate":"2023-05-01T00:00:00Z"},
            {"eventAction":"registration","eventDate":"1995-08-14T04:00:00Z"}
        ]}"#;
        let body: RdapDomain = serde_json::from_str(raw).unwrap();
        let registered = registration_date(&body).unwrap();
        let now = DateTime::parse_from_rfc3339("1996-08-14T04:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(age_in_days(registered, now), 366);
    }

    #[test]
    fn missing_registration_is_an_error() {
        let body: RdapDomain = serde_json::from_str(r#"{"events":[]}"#).unwrap();
        assert!(registration_date(&body).is_err());
    }

    #[test]
    fn future_dates_clamp_to_zero() {
        let now = Utc::now();
        assert_eq!(age_in_days(now + chrono::Duration::days(3), now), 0);
    }
}
