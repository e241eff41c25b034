use crate::config::Config;
use crate::error::BlogError;
use crate::service::classifier::{
    AllowAllClassifier, CommentClassifier, GeminiClassifier, ModerationVerdict,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fail-open wrapper around a [`CommentClassifier`].
///
/// `review` never errors: classifier failures and timeouts are logged and the
/// comment is treated as safe.
#[derive(Clone)]
pub struct Moderator {
    classifier: Arc<dyn CommentClassifier>,
    timeout: Duration,
}

impl Moderator {
    pub fn new(classifier: Arc<dyn CommentClassifier>, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
        }
    }

    pub fn allow_all() -> Self {
        Self::new(Arc::new(AllowAllClassifier), Duration::from_secs(1))
    }

    pub fn from_config(cfg: &Config) -> Result<Self, BlogError> {
        match GeminiClassifier::from_config(cfg)? {
            Some(gemini) => {
                info!(model = %cfg.gemini_model, "comment moderation enabled");
                Ok(Self::new(Arc::new(gemini), cfg.moderation_timeout()))
            }
            None => {
                warn!("GEMINI_API_KEY not set; comments will not be moderated");
                Ok(Self::allow_all())
            }
        }
    }

    pub async fn review(&self, text: &str) -> ModerationVerdict {
        match tokio::time::timeout(self.timeout, self.classifier.classify(text)).await {
            Ok(Ok(verdict)) => {
                debug!(classifier = self.classifier.name(), ?verdict, "comment reviewed");
                verdict
            }
            Ok(Err(e)) => {
                warn!(
                    classifier = self.classifier.name(),
                    error = %e,
                    "moderation failed; accepting comment unflagged"
                );
                ModerationVerdict::Safe
            }
            Err(_) => {
                warn!(
                    classifier = self.classifier.name(),
                    error = %BlogError::ModerationTimeout,
                    timeout = ?self.timeout,
                    "moderation failed; accepting comment unflagged"
                );
                ModerationVerdict::Safe
            }
        }
    }
}
