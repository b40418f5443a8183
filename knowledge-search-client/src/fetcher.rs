use crate::error::Error;
use async_trait::async_trait;
use futures::Future;
use serde_json::Value;
use std::time::Duration;
use surf::Client;
pub use surf::Url;
use utils::retry::RetryPolicy;
use utils::surf_logging::SurfLogging;

/// Fetches a JSON document. The seam between the cache-aside logic and the network.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn get_json(&self, url: &Url) -> Result<Value, Error>;
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Per-attempt timeout
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            user_agent: concat!("knowledge-search-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// `JsonFetcher` over surf with a timeout per attempt and exponential backoff.
#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
    config: HttpConfig,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}

impl HttpFetcher {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            http: Client::new().with(SurfLogging),
            config,
        }
    }

    async fn attempt(&self, url: &Url) -> Result<Value, Error> {
        let request = self
            .http
            .get(url.as_str())
            .header("User-Agent", self.config.user_agent.as_str())
            .header("Accept", "application/json");

        let exchange = async {
            let mut response = request.await.map_err(|err| Error::Transport(err.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::Http {
                    status: u16::from(status),
                    url: url.to_string(),
                });
            }
            response
                .body_json::<Value>()
                .await
                .map_err(|err| Error::Decode(err.to_string()))
        };

        tokio::time::timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| Error::Timeout {
                url: url.to_string(),
                seconds: self.config.timeout.as_secs(),
            })?
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn get_json(&self, url: &Url) -> Result<Value, Error> {
        with_retries(&self.config.retry, || self.attempt(url)).await
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the policy is exhausted.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut retry = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retry < policy.retries() => {
                retry += 1;
                let delay = policy.backoff(retry);
                log::warn!(
                    "{} (retry {}/{} in {:?})",
                    err,
                    retry,
                    policy.retries(),
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
