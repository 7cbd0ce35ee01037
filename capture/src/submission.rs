//! # Submission Client
//!
//! Posts one [`AttendanceSubmission`] to the attendance backend and maps the
//! `{success, data, message}` envelope onto a receipt or a [`SubmitError`].
//!
//! One call is one request. Retrying is the user's decision and goes through
//! the whole flow again, with a fresh location and timestamp.

use crate::error::SubmitError;
use crate::traits::context::SessionContextProvider;
use crate::traits::submitter::AttendanceSubmitter;
use crate::types::{AttendanceSubmission, Direction, SubmissionReceipt};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Response wrapper used by every backend endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpSubmitter {
    client: Client,
    base_url: String,
    check_in_path: String,
    check_out_path: String,
    context: Arc<dyn SessionContextProvider>,
}

impl HttpSubmitter {
    /// Builds a client for `base_url` with the default check-in/check-out paths.
    ///
    /// `timeout` caps the whole request, connect included.
    pub fn new(
        base_url: impl Into<String>,
        context: Arc<dyn SessionContextProvider>,
        timeout: Duration,
    ) -> Result<Self, SubmitError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            check_in_path: "/attendance/check-in".into(),
            check_out_path: "/attendance/check-out".into(),
            context,
        })
    }

    /// Client for `ATTENDANCE_API_URL` with the configured paths and timeout.
    pub fn from_config(context: Arc<dyn SessionContextProvider>) -> Result<Self, SubmitError> {
        Ok(Self::new(
            util::config::attendance_api_url(),
            context,
            Duration::from_secs(util::config::http_timeout_secs()),
        )?
        .with_paths(
            util::config::check_in_path(),
            util::config::check_out_path(),
        ))
    }

    pub fn with_paths(mut self, check_in: impl Into<String>, check_out: impl Into<String>) -> Self {
        self.check_in_path = check_in.into();
        self.check_out_path = check_out.into();
        self
    }

    pub fn endpoint(&self, direction: Direction) -> String {
        let path = match direction {
            Direction::CheckIn => &self.check_in_path,
            Direction::CheckOut => &self.check_out_path,
        };
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn interpret(status: StatusCode, body: &str) -> Result<SubmissionReceipt, SubmitError> {
    let Ok(envelope) = serde_json::from_str::<Envelope>(body) else {
        return Err(SubmitError::Network(if status.is_success() {
            "unexpected response from server".into()
        } else {
            format!("HTTP {status}")
        }));
    };

    if !status.is_success() || !envelope.success {
        let message = envelope
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("request failed (HTTP {})", status.as_u16()));
        return Err(SubmitError::ServerRejected(message));
    }

    let mut receipt = match envelope.data {
        Some(data @ Value::Object(_)) => serde_json::from_value(data).unwrap_or_default(),
        _ => SubmissionReceipt::default(),
    };
    receipt.message = envelope.message;
    Ok(receipt)
}

#[async_trait]
impl AttendanceSubmitter for HttpSubmitter {
    async fn submit(
        &self,
        direction: Direction,
        submission: &AttendanceSubmission,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let context = self
            .context
            .current()
            .map_err(|e| SubmitError::NotSignedIn(e.to_string()))?;
        let url = self.endpoint(direction);

        info!(
            %direction,
            station = submission.qr_data().station_id(),
            user = submission.user_id(),
            "submitting attendance"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&context.token)
            .json(submission)
            .send()
            .await
            .inspect_err(|e| warn!(error = %e, %url, "attendance request failed"))?;

        let status = response.status();
        let body = response.text().await?;

        let result = interpret(status, &body);
        match &result {
            Ok(receipt) => info!(
                %direction,
                location = ?receipt.location_label,
                terminal = ?receipt.terminal_id,
                "attendance accepted"
            ),
            Err(e) => warn!(%direction, %status, error = %e, "attendance not accepted"),
        }
        result
    }
}
