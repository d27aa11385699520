use std::collections::BTreeMap;
use std::env;

use async_trait::async_trait;
use exam_core::model::{AnswerState, OptionLabel, QuestionId, TestId};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GradingError;

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

/// One question's answer as handed to the grading endpoint.
///
/// `is_answered` is derived state inside the engine but serialized explicitly
/// here; the grading side consumes the payload without re-deriving anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub selected_answer: Option<OptionLabel>,
    pub is_answered: bool,
    pub is_flagged: bool,
}

impl From<&AnswerState> for SubmittedAnswer {
    fn from(state: &AnswerState) -> Self {
        Self {
            selected_answer: state.selected_answer,
            is_answered: state.is_answered(),
            is_flagged: state.is_flagged,
        }
    }
}

/// The full answer set plus timing, submitted once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSubmission {
    pub test_id: TestId,
    pub answers: BTreeMap<QuestionId, SubmittedAnswer>,
    pub time_spent_seconds: u32,
}

/// What the grading endpoint returns: an identifier the presentation layer
/// navigates to a results view with, plus optional score data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingReceipt {
    pub result_id: Uuid,
    pub score_percent: Option<u32>,
    pub passed: Option<bool>,
}

//
// ─── CLIENT ────────────────────────────────────────────────────────────────────
//

/// The external scoring collaborator. The engine never computes a score
/// itself; it hands the answer set over and records the receipt.
#[async_trait]
pub trait GradingClient: Send + Sync {
    /// Submit an attempt for grading.
    ///
    /// # Errors
    ///
    /// Returns `GradingError` when the endpoint is unreachable, rejects the
    /// payload, or is not configured.
    async fn grade(&self, submission: &AttemptSubmission) -> Result<GradingReceipt, GradingError>;
}

#[derive(Clone, Debug)]
pub struct GradingConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl GradingConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("EXAM_GRADING_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let api_key = env::var("EXAM_GRADING_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        Some(Self { base_url, api_key })
    }
}

/// HTTP implementation of [`GradingClient`].
#[derive(Clone)]
pub struct HttpGradingClient {
    client: Client,
    config: Option<GradingConfig>,
}

impl HttpGradingClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GradingConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GradingConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl GradingClient for HttpGradingClient {
    async fn grade(&self, submission: &AttemptSubmission) -> Result<GradingReceipt, GradingError> {
        let config = self.config.as_ref().ok_or(GradingError::Disabled)?;

        let url = format!("{}/attempts", config.base_url.trim_end_matches('/'));
        let mut request = self.client.post(url).json(submission);
        if let Some(key) = &config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(GradingError::HttpStatus(response.status()));
        }

        let receipt: GradingReceipt = response.json().await?;
        Ok(receipt)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
