use dynconf::{DynconfError, Listener, ListenerContext, Subscription};
use fxhash::FxHashMap;
use reqwest::{Client, Method};
use serde::Deserialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const KIND: &str = "http";

const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Options of an `http` listener.
///
/// ```yaml
/// listener: http
/// url: http://config.local/dynconf   # used by datas without their own url
/// method: GET
/// interval: 30s
/// timeout: 10s
/// datas:
///   - { group: g, data_id: d, callbacks: ["g:d"], url: http://config.local/degrade }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_interval", deserialize_with = "crate::duration::deserialize")]
    pub interval: Duration,
    #[serde(default = "default_timeout", deserialize_with = "crate::duration::deserialize")]
    pub timeout: Duration,
    #[serde(default)]
    pub datas: Vec<HttpData>,
}

/// A polled entry: a subscription plus an optional url of its own.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpData {
    #[serde(flatten)]
    pub subscription: Subscription,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_method() -> String {
    "GET".to_owned()
}

const fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

const fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

#[derive(Debug)]
struct Target {
    url: String,
    subscription: Subscription,
}

/// Polls each configured url and dispatches its body whenever it changes.
///
/// Bodies are compared per source key; an unchanged body is not dispatched
/// again, whether or not its last dispatch succeeded. Non-2xx responses and
/// transport errors are logged and retried on the next tick.
#[derive(Debug)]
pub struct HttpListener {
    client: Client,
    method: Method,
    interval: Duration,
    targets: Vec<Target>,
}

impl HttpListener {
    /// Validates `config` and builds the HTTP client.
    ///
    /// # Errors
    /// [`DynconfError::Listener`] for an invalid method, a zero interval, a
    /// data entry without any url, or a client that cannot be built.
    pub fn new(config: HttpConfig) -> Result<Self, DynconfError> {
        let method = Method::from_bytes(config.method.to_ascii_uppercase().as_bytes())
            .map_err(|err| invalid(format!("method {:?}: {err}", config.method)))?;
        if config.interval.is_zero() {
            return Err(invalid("interval must be greater than zero"));
        }

        let targets = config
            .datas
            .into_iter()
            .map(|data| {
                let url = data.url.or_else(|| config.url.clone()).ok_or_else(|| {
                    invalid(format!("{} has no url", data.subscription.source_key()))
                })?;
                Ok(Target { url, subscription: data.subscription })
            })
            .collect::<Result<Vec<_>, DynconfError>>()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| invalid(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { client, method, interval: config.interval, targets })
    }

    async fn fetch(&self, target: &Target) -> Option<Vec<u8>> {
        let response = match self.client.request(self.method.clone(), &target.url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(url = %target.url, %err, "Polling failed");
                return None;
            },
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = %target.url, %status, "Polling returned an error status");
            return None;
        }

        match response.bytes().await {
            Ok(body) => Some(body.to_vec()),
            Err(err) => {
                warn!(url = %target.url, %err, "Reading polled body failed");
                None
            },
        }
    }

    async fn run(self, ctx: ListenerContext) {
        let mut shutdown = ctx.shutdown();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seen: FxHashMap<String, Vec<u8>> = FxHashMap::default();

        info!(listener = KIND, targets = self.targets.len(), interval = ?self.interval, "Polling started");
        loop {
            tokio::select! {
                () = shutdown.wait() => break,
                _ = ticker.tick() => {},
            }

            for target in &self.targets {
                let Some(body) = self.fetch(target).await else { continue };
                let source_key = target.subscription.source_key();
                if seen.get(&source_key).is_some_and(|last| *last == body) {
                    continue;
                }

                debug!(%source_key, bytes = body.len(), "Polled content changed");
                ctx.deliver(&target.subscription, body.as_slice()).await;
                seen.insert(source_key, body);
            }
        }
        info!(listener = KIND, "Polling stopped");
    }
}

impl Listener for HttpListener {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn start(self: Box<Self>, ctx: ListenerContext) -> Result<JoinHandle<()>, DynconfError> {
        Ok(tokio::spawn((*self).run(ctx)))
    }
}

fn invalid(message: impl Into<String>) -> DynconfError {
    DynconfError::Listener { message: message.into().into(), context: Some(KIND.into()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> HttpConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(json!({ "url": "http://localhost/x" }));
        assert_eq!(cfg.method, "GET");
        assert_eq!(cfg.interval, Duration::from_secs(30));
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert!(cfg.datas.is_empty());
    }

    #[test]
    fn data_urls_fall_back_to_the_listener_url() {
        let listener = HttpListener::new(config(json!({
            "url": "http://localhost/base",
            "interval": "250ms",
            "datas": [
                { "group": "g", "data_id": "a", "callbacks": ["a"] },
                { "group": "g", "data_id": "b", "callbacks": ["b"], "url": "http://localhost/b" },
            ],
        })))
        .unwrap();

        let urls: Vec<_> = listener.targets.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(urls, ["http://localhost/base", "http://localhost/b"]);
        assert_eq!(listener.interval, Duration::from_millis(250));
    }

    #[test]
    fn data_without_any_url_is_rejected() {
        let err = HttpListener::new(config(json!({
            "datas": [{ "group": "g", "data_id": "a" }],
        })))
        .unwrap_err();
        assert_eq!(err.to_string(), "Listener error (http): g:a has no url");
    }

    #[test]
    fn invalid_method_is_rejected() {
        let err = HttpListener::new(config(json!({ "method": "GE T" }))).unwrap_err();
        assert!(matches!(err, DynconfError::Listener { .. }));
    }
}
