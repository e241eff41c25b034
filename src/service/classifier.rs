use crate::api::GeminiApi;
use crate::config::Config;
use crate::error::{BlogError, GeminiError};
use crate::types::gemini::{GenerateContentRequest, GenerateContentResponse};
use async_trait::async_trait;
use backon::ExponentialBuilder;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Outcome of reviewing one comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationVerdict {
    Safe,
    NeedsReview,
}

impl ModerationVerdict {
    /// Interpret the model's one-word answer. Anything that does not ask
    /// for review is treated as safe.
    pub fn from_model_text(text: &str) -> Self {
        let normalized = text.trim().to_ascii_lowercase();
        if normalized.contains("needs_review") || normalized.contains("needs review") {
            Self::NeedsReview
        } else {
            Self::Safe
        }
    }

    pub fn is_flagged(self) -> bool {
        matches!(self, Self::NeedsReview)
    }
}

/// Decides whether a comment needs human review.
#[async_trait]
pub trait CommentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ModerationVerdict, BlogError>;

    fn name(&self) -> &'static str;
}

/// Used when no Gemini key is configured.
pub struct AllowAllClassifier;

#[async_trait]
impl CommentClassifier for AllowAllClassifier {
    async fn classify(&self, _text: &str) -> Result<ModerationVerdict, BlogError> {
        Ok(ModerationVerdict::Safe)
    }

    fn name(&self) -> &'static str {
        "allow-all"
    }
}

pub fn moderation_prompt(comment: &str) -> String {
    format!(
        "You moderate comments on a public blog. Classify the comment between the markers.\n\
         Answer with exactly one word: `safe` if it is acceptable, or `needs_review` if it \
         contains harassment, hate speech, threats, sexual content, spam, or other abuse.\n\
         <comment>\n{comment}\n</comment>"
    )
}

/// Classifier backed by Gemini `generateContent`.
pub struct GeminiClassifier {
    client: reqwest::Client,
    url: Url,
    api_key: String,
    retries: usize,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl GeminiClassifier {
    pub fn new(
        client: reqwest::Client,
        url: Url,
        api_key: impl Into<String>,
        rate_per_minute: u32,
        retries: usize,
    ) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(rate_per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            client,
            url,
            api_key: api_key.into(),
            retries,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Build from config; `None` when no API key is set.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>, BlogError> {
        let Some(key) = cfg.gemini_key() else {
            return Ok(None);
        };
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("inkpost/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(cfg.moderation_timeout());
        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        let client = builder.build()?;
        Ok(Some(Self::new(
            client,
            cfg.gemini_generate_url()?,
            key,
            cfg.moderation_rate_per_minute,
            cfg.moderation_retries,
        )))
    }

    fn retry_policy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.retries)
            .with_jitter()
    }
}

#[async_trait]
impl CommentClassifier for GeminiClassifier {
    async fn classify(&self, text: &str) -> Result<ModerationVerdict, BlogError> {
        self.limiter.until_ready().await;

        let body = GenerateContentRequest::from_prompt(moderation_prompt(text));
        let resp = GeminiApi::try_generate(
            self.client.clone(),
            &self.url,
            &self.api_key,
            self.retry_policy(),
            &body,
        )
        .await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.bytes().await?;
            return Err(match serde_json::from_slice::<GeminiError>(&raw) {
                Ok(err) => BlogError::GeminiServerError(err),
                Err(_) => BlogError::UpstreamStatus(status),
            });
        }

        let payload: GenerateContentResponse = resp.json().await?;
        let answer = payload.first_text().ok_or(BlogError::EmptyModeration)?;
        debug!(answer = %answer.trim(), "Gemini moderation answer");
        Ok(ModerationVerdict::from_model_text(answer))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_parsing() {
        assert_eq!(ModerationVerdict::from_model_text("safe"), ModerationVerdict::Safe);
        assert_eq!(
            ModerationVerdict::from_model_text(" needs_review\n"),
            ModerationVerdict::NeedsReview
        );
        assert_eq!(
            ModerationVerdict::from_model_text("NEEDS_REVIEW"),
            ModerationVerdict::NeedsReview
        );
        assert_eq!(
            ModerationVerdict::from_model_text("`needs review`"),
            ModerationVerdict::NeedsReview
        );
        assert_eq!(ModerationVerdict::from_model_text("unsure"), ModerationVerdict::Safe);
    }

    #[test]
    fn only_needs_review_is_flagged() {
        assert!(ModerationVerdict::NeedsReview.is_flagged());
        assert!(!ModerationVerdict::Safe.is_flagged());
    }

    #[test]
    fn prompt_embeds_comment() {
        let p = moderation_prompt("hello there");
        assert!(p.contains("<comment>\nhello there\n</comment>"));
        assert!(p.contains("needs_review"));
    }

    #[test]
    fn no_key_means_no_gemini_classifier() {
        let cfg = Config::default();
        assert!(GeminiClassifier::from_config(&cfg).unwrap().is_none());
    }

    #[tokio::test]
    async fn allow_all_never_flags() {
        let verdict = AllowAllClassifier.classify("anything").await.unwrap();
        assert_eq!(verdict, ModerationVerdict::Safe);
    }
}
