use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::warn;
use url::Url;

pub struct GeminiApi;

impl GeminiApi {
    /// POST a `generateContent` body with API-key auth.
    ///
    /// Transport errors and 5xx responses are retried under `retry_policy`;
    /// any other status is handed back to the caller untouched.
    pub async fn try_generate<T>(
        client: reqwest::Client,
        url: &Url,
        api_key: impl AsRef<str>,
        retry_policy: ExponentialBuilder,
        body: &T,
    ) -> Result<reqwest::Response, reqwest::Error>
    where
        T: serde::Serialize,
    {
        (|| async {
            let resp = client
                .post(url.clone())
                .header("x-goog-api-key", api_key.as_ref())
                .json(body)
                .send()
                .await?;
            if resp.status().is_server_error() {
                warn!(status = %resp.status(), "Gemini server error (will retry)");
                return resp.error_for_status();
            }
            Ok(resp)
        })
        .retry(retry_policy)
        .when(is_transient)
        .notify(|err: &reqwest::Error, dur: Duration| {
            warn!("Gemini request retrying after error {}, sleeping {:?}", err, dur);
        })
        .await
    }
}

/// Connection failures, timeouts and 5xx responses.
fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout()
        || err.is_connect()
        || err.status().is_some_and(|s| s.is_server_error())
}
