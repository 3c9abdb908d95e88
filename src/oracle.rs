// Client side of the verification-oracle wire protocol.
//
// Candidates go out as one POST with a repeated, hex-encoded 'message'
// form field; the server answers with a JSON array of statuses in the
// same order. A single reqwest client (and so a single connection pool)
// is shared across every call made through one HttpOracle, which speeds
// up the thousands of round-trips a serial attack makes.
use crate::{bytes_to_hex, AttackError};

use log::warn;
use serde::{Deserialize, Serialize};

use std::time::Duration;

/// One element of the oracle's JSON response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub status: String,
}

/// Categorical verdict the oracle gives for one submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleStatus {
    /// Padding parsed and the authentication tag checked out.
    Valid,
    /// Padding parsed but the authentication tag did not match. This is
    /// the attack's distinguishing signal.
    InvalidMac,
    /// Anything else the server reports, e.g. "invalid_padding".
    Other(String),
}

impl From<&str> for OracleStatus {
    fn from(status: &str) -> Self {
        match status {
            "valid" => OracleStatus::Valid,
            "invalid_mac" => OracleStatus::InvalidMac,
            other => OracleStatus::Other(other.to_string()),
        }
    }
}

impl OracleStatus {
    pub fn wire(&self) -> &str {
        match self {
            OracleStatus::Valid => "valid",
            OracleStatus::InvalidMac => "invalid_mac",
            OracleStatus::Other(status) => status,
        }
    }
}

/// A verification oracle: one status per submitted message, order
/// preserving. The recovery engine only ever talks to this trait, so
/// tests can swap the HTTP client for an in-process oracle.
#[allow(async_fn_in_trait)]
pub trait Oracle {
    async fn query(&self, messages: &[Vec<u8>]) -> Result<Vec<OracleStatus>, AttackError>;
}

pub struct HttpOracle {
    client: reqwest::Client,
    url: String,
    retry_delay: Duration,
    max_attempts: Option<usize>,
}

impl HttpOracle {
    /// An oracle client with the reference retry policy: on any transient
    /// failure, wait 10 seconds and retry the identical request, forever.
    pub fn new(url: &str) -> Self {
        Self::with_retry(url, Duration::from_secs(10), None)
    }

    /// Like [`HttpOracle::new`] but with a custom back-off and an optional
    /// cap on attempts, after which the client gives up with
    /// [`AttackError::OracleExhausted`].
    pub fn with_retry(url: &str, retry_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            retry_delay,
            max_attempts,
        }
    }

    async fn try_query(&self, messages: &[Vec<u8>]) -> Result<Vec<OracleStatus>, String> {
        let form: Vec<(&str, String)> = messages
            .iter()
            .map(|message| ("message", bytes_to_hex(message)))
            .collect();
        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let body: Vec<VerifyResponse> = response.json().await.map_err(|e| e.to_string())?;
        if body.len() != messages.len() {
            return Err(format!(
                "oracle returned {} statuses for {} messages",
                body.len(),
                messages.len()
            ));
        }
        Ok(body
            .iter()
            .map(|r| OracleStatus::from(r.status.as_str()))
            .collect())
    }
}

impl Oracle for HttpOracle {
    async fn query(&self, messages: &[Vec<u8>]) -> Result<Vec<OracleStatus>, AttackError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.try_query(messages).await {
                Ok(statuses) => return Ok(statuses),
                Err(reason) => {
                    if self.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(AttackError::OracleExhausted(attempts));
                    }
                    warn!(
                        "oracle request failed: {reason}; retrying in {:?}",
                        self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}
