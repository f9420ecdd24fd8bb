//! Cluster titling.
//!
//! A [`TitleGenerator`] turns a cluster's representative words into a short
//! label, usually by asking a language model. [`ClusterTitler`] wraps a
//! generator with retries, sanitization, and a deterministic fallback so a
//! title is always produced.

mod chat;

pub use chat::ChatCompletionGenerator;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::TitlingSettings;
use crate::error::TitlingError;

/// Separator joining title tokens.
pub const TITLE_SEPARATOR: char = '_';

/// System message sent with every title request.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that generates concise category titles.";

/// Produces a raw (unsanitized) title for a list of words.
pub trait TitleGenerator: Send + Sync {
    fn generate_title(&self, words: &[String]) -> Result<String, TitlingError>;
}

impl<F> TitleGenerator for F
where
    F: Fn(&[String]) -> Result<String, TitlingError> + Send + Sync,
{
    fn generate_title(&self, words: &[String]) -> Result<String, TitlingError> {
        self(words)
    }
}

/// How often and how patiently to retry a failed title request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: usize,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &TitlingSettings) -> Self {
        Self {
            max_attempts: settings.max_retries.max(1),
            delay: Duration::from_millis(settings.retry_delay_ms),
        }
    }

    /// Retry without pausing, for tests and local runs.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::ZERO,
        }
    }
}

/// Retrying, never-failing titler used by the categorization pipeline.
#[derive(Clone)]
pub struct ClusterTitler {
    generator: Option<Arc<dyn TitleGenerator>>,
    policy: RetryPolicy,
}

impl ClusterTitler {
    pub fn new(generator: Arc<dyn TitleGenerator>, policy: RetryPolicy) -> Self {
        Self {
            generator: Some(generator),
            policy,
        }
    }

    /// A titler that skips the generator and always uses fallback titles.
    pub fn fallback_only() -> Self {
        Self {
            generator: None,
            policy: RetryPolicy::default(),
        }
    }

    /// Build from settings; without an API key every cluster gets a
    /// fallback title.
    pub fn from_settings(settings: &TitlingSettings) -> Result<Self, TitlingError> {
        if settings.api_key.trim().is_empty() {
            tracing::warn!(
                "no titling API key configured; clusters will get fallback titles (set WORDSENSE_TITLING__API_KEY)"
            );
            return Ok(Self::fallback_only());
        }
        let generator = ChatCompletionGenerator::new(settings)?;
        Ok(Self::new(
            Arc::new(generator),
            RetryPolicy::from_settings(settings),
        ))
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Ask the generator for a title, retrying per the policy.
    ///
    /// A response that sanitizes to an empty string counts as a failed
    /// attempt.
    pub fn try_title(&self, words: &[String]) -> Result<String, TitlingError> {
        let Some(generator) = &self.generator else {
            return Err(TitlingError::Exhausted {
                attempts: 0,
                last: "no title generator configured".to_string(),
            });
        };

        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let result = generator.generate_title(words).and_then(|raw| {
                let title = sanitize_title(&raw);
                if title.is_empty() {
                    Err(TitlingError::EmptyTitle)
                } else {
                    Ok(title)
                }
            });

            match result {
                Ok(title) => return Ok(title),
                Err(e) => {
                    tracing::warn!("title attempt {attempt}/{attempts} failed: {e}");
                    last_error = Some(e);
                }
            }

            if attempt < attempts && !self.policy.delay.is_zero() {
                tracing::debug!("retrying in {:?}", self.policy.delay);
                thread::sleep(self.policy.delay);
            }
        }

        Err(TitlingError::Exhausted {
            attempts,
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Title for a cluster; falls back to [`fallback_title`] once retries
    /// are exhausted.
    pub fn title(&self, words: &[String]) -> String {
        match self.try_title(words) {
            Ok(title) => title,
            Err(e) => {
                let fallback = fallback_title(words);
                if self.generator.is_some() {
                    tracing::warn!("{e}; using fallback title '{fallback}'");
                }
                fallback
            }
        }
    }
}

/// Normalize model output into a storage-safe key.
///
/// Trims whitespace, turns spaces into the separator, and drops every
/// character that is neither alphanumeric nor the separator.
pub fn sanitize_title(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c == ' ' { TITLE_SEPARATOR } else { c })
        .filter(|c| c.is_alphanumeric() || *c == TITLE_SEPARATOR)
        .collect()
}

/// `Cluster_<w1>_<w2>_<w3>` from the first three representative words.
pub fn fallback_title(words: &[String]) -> String {
    std::iter::once("Cluster")
        .chain(words.iter().take(3).map(String::as_str))
        .collect::<Vec<_>>()
        .join("_")
}

/// User prompt asking for a three-word title.
pub fn build_prompt(words: &[String]) -> String {
    let words_string = words.join(", ");
    format!(
        "You are an expert linguist analyzing word clusters.
Given the following related words: {words_string}

Generate EXACTLY 3 words (separated by underscores) that best describe the common theme or category of these words.
The title should be concise, descriptive, and capture the semantic essence.

Examples:
- If words are: doctor, nurse, hospital, medicine → Medical_Health_Care
- If words are: computer, software, programming, code → Technology_Computing_Software
- If words are: happy, joy, excited, cheerful → Positive_Emotions_Feelings

Respond with ONLY the 3-word title, nothing else."
    )
}
