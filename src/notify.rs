//! Threshold alert notifications over an email webhook

use crate::types::{AlertLevel, ScoreReport};
use serde::Serialize;
use tracing::{debug, error, info};

/// Sender name shown on dispatched alerts
pub const ALERT_SENDER_NAME: &str = "FANTASMA Alert";

/// Notifier settings
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub email_webhook_url: Option<String>,
    pub alert_email_to: String,
    pub threshold: u32,
}

/// What happened on one threshold check
#[derive(Debug, Clone, Serialize)]
pub struct NotifyOutcome {
    pub sent: bool,
    pub score: u32,
    pub level: AlertLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    to: &'a str,
    subject: String,
    message: String,
    name: &'a str,
}

/// Posts a message to the email webhook when the total score reaches the threshold
#[derive(Clone)]
pub struct AlertNotifier {
    config: NotifierConfig,
    client: reqwest::Client,
}

impl AlertNotifier {
    pub fn new(client: reqwest::Client, config: NotifierConfig) -> Self {
        Self { config, client }
    }

    pub fn threshold(&self) -> u32 {
        self.config.threshold
    }

    /// Dispatch an alert for `report` if it is over threshold
    ///
    /// Delivery failures are reported in the outcome.
    pub async fn check_and_notify(&self, report: &ScoreReport) -> NotifyOutcome {
        let mut outcome = NotifyOutcome {
            sent: false,
            score: report.total_score,
            level: report.alert_level,
            reason: None,
            delivery_error: None,
        };

        if report.total_score < self.config.threshold {
            outcome.reason = Some(format!(
                "Score {} below threshold {}",
                report.total_score, self.config.threshold
            ));
            debug!(score = report.total_score, "Below alert threshold");
            return outcome;
        }

        let Some(webhook_url) = self.config.email_webhook_url.as_deref() else {
            outcome.reason = Some("email webhook not configured".to_string());
            return outcome;
        };

        match self.send_email(webhook_url, report).await {
            Ok(()) => {
                info!(
                    score = report.total_score,
                    level = %report.alert_level,
                    to = %self.config.alert_email_to,
                    "Alert dispatched"
                );
                outcome.sent = true;
            }
            Err(e) => {
                error!("Failed to send alert email: {:#}", e);
                outcome.delivery_error = Some(format!("{:#}", e));
            }
        }
        outcome
    }

    async fn send_email(&self, webhook_url: &str, report: &ScoreReport) -> anyhow::Result<()> {
        let payload = EmailPayload {
            to: &self.config.alert_email_to,
            subject: compose_subject(report),
            message: compose_message(report),
            name: ALERT_SENDER_NAME,
        };

        let response = self.client.post(webhook_url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow::anyhow!("Email webhook failed: {}", status));
        }
        Ok(())
    }
}

pub fn compose_subject(report: &ScoreReport) -> String {
    format!(
        "{} FANTASMA: {} - Score {}/{}",
        report.alert_emoji, report.alert_level, report.total_score, report.max_possible
    )
}

/// Plain-text alert body listing every scoring signal
pub fn compose_message(report: &ScoreReport) -> String {
    let mut lines = vec![
        format!(
            "{} FANTASMA ALERT - Score: {}/{}",
            report.alert_emoji, report.total_score, report.max_possible
        ),
        String::new(),
        format!("Level: {}", report.alert_level),
        format!("Recommended action: {}", report.recommended_action),
        String::new(),
        "ACTIVE SIGNALS:".to_string(),
    ];

    if report.active_signals.is_empty() {
        lines.push("- none".to_string());
    }
    for signal in &report.active_signals {
        let value = signal
            .value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        lines.push(format!(
            "- {}: {} (+{} pts)",
            signal.signal, value, signal.score
        ));
    }

    lines.push(String::new());
    lines.push(format!("Timestamp: {}", report.timestamp.to_rfc3339()));
    lines.join("\n")
}
