// src/services/alert.rs

//! Operational alerts.
//!
//! Alerts always go to the log. When a webhook is configured they are also
//! posted as a Slack-style attachment. Delivery problems are logged and
//! swallowed; alerting never fails a run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::models::AlertConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Attachment color.
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Info => "good",
            Severity::Warning => "warning",
            Severity::Error | Severity::Critical => "danger",
        }
    }
}

/// A structured failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Component that raised it
    pub component: String,
    /// URL, storage key or index step involved
    pub source: String,
    pub message: String,
    pub severity: Severity,
}

impl Alert {
    pub fn new(
        component: impl Into<String>,
        source: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            component: component.into(),
            source: source.into(),
            message: message.into(),
            severity,
        }
    }

    /// Build an alert from the fields the error already carries.
    pub fn from_error(error: &AppError) -> Self {
        let severity = match error {
            AppError::Sync { .. } | AppError::Archive { .. } => Severity::Critical,
            _ => Severity::Error,
        };
        Self::new(
            error.component(),
            error.source_hint().unwrap_or_default(),
            error.detail(),
            severity,
        )
    }

    /// Webhook body for this alert.
    pub fn to_payload(&self, machine: &str, time: &str) -> Value {
        json!({
            "attachments": [{
                "author_name": self.component,
                "color": self.severity.color(),
                "pretext": format!("[SCRAPER] New Alert for {} : {}", self.component, self.source),
                "fields": [
                    { "title": "Message", "value": self.message, "short": false },
                    { "title": "Machine Location", "value": machine, "short": true },
                    { "title": "Time", "value": time, "short": true },
                    { "title": "Severity", "value": self.severity.as_str(), "short": true },
                ]
            }]
        })
    }
}

/// Destination for alerts. Implementations must not fail.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn report(&self, alert: &Alert);
}

fn log_alert(alert: &Alert) {
    log::error!(
        "[{}] {} ({}): {}",
        alert.severity.as_str(),
        alert.component,
        alert.source,
        alert.message
    );
}

/// Logs alerts and nothing else. Used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleAlertSink;

#[async_trait]
impl AlertSink for ConsoleAlertSink {
    async fn report(&self, alert: &Alert) {
        log_alert(alert);
    }
}

/// Logs alerts and posts them to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookAlertSink {
    client: Client,
    url: String,
    machine: String,
}

impl WebhookAlertSink {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            machine: machine_location(),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn report(&self, alert: &Alert) {
        log_alert(alert);

        let time = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let payload = alert.to_payload(&self.machine, &time);

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                log::debug!("Alert delivered to webhook");
            }
            Ok(response) => {
                log::warn!("Alert webhook answered {}", response.status());
            }
            Err(e) => {
                log::warn!("Alert webhook unreachable: {}", e);
            }
        }
    }
}

/// Pick the sink the configuration asks for.
pub fn alert_sink_from_config(config: &AlertConfig, client: Client) -> Arc<dyn AlertSink> {
    match &config.webhook_url {
        Some(url) => Arc::new(WebhookAlertSink::new(client, url.clone())),
        None => {
            log::info!("No alert webhook configured; alerts go to the log only");
            Arc::new(ConsoleAlertSink)
        }
    }
}

fn machine_location() -> String {
    ["USER", "USERNAME", "HOSTNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error_keeps_structure() {
        let err = AppError::archive("data/doctors/data.json", "access denied");
        let alert = Alert::from_error(&err);

        assert_eq!(alert.component, "ArchiveStore");
        assert_eq!(alert.source, "data/doctors/data.json");
        assert_eq!(alert.message, "access denied");
        assert_eq!(alert.severity, Severity::Critical);
    }

    #[test]
    fn test_payload_schema() {
        let alert = Alert::new("PageCounter", "http://x/?p=1", "No pages found.", Severity::Error);
        let payload = alert.to_payload("worker-1", "2026-10-15 06:00:00");
        let attachment = &payload["attachments"][0];

        assert_eq!(attachment["author_name"], "PageCounter");
        assert_eq!(attachment["color"], "danger");
        assert_eq!(
            attachment["pretext"],
            "[SCRAPER] New Alert for PageCounter : http://x/?p=1"
        );
        let fields = attachment["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0]["title"], "Message");
        assert_eq!(fields[0]["value"], "No pages found.");
        assert_eq!(fields[0]["short"], false);
        assert_eq!(fields[3]["value"], "ERROR");
    }

    #[test]
    fn test_colors_by_severity() {
        assert_eq!(Severity::Info.color(), "good");
        assert_eq!(Severity::Warning.color(), "warning");
        assert_eq!(Severity::Critical.color(), "danger");
    }
}
