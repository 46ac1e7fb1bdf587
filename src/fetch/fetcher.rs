//! Cached fetcher.
//!
//! The cache is consulted and populated without holding its lock across
//! network I/O. Two racing fetches of one URL may both hit the network; the
//! last write wins, which is harmless since both store the same resource.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::error::{LogoError, Result};
use crate::fetch::{
    data_uri, RetryPolicy, Transport, TransportResponse, DEFAULT_ORIGINAL_TTL,
    DEFAULT_REPLACED_TTL,
};

/// Which side of a pair a URL belongs to. Decides the default TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRole {
    Original,
    Replaced,
}

impl std::fmt::Display for SourceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Replaced => write!(f, "replaced"),
        }
    }
}

// == TTL Policy ==
/// Default cache lifetimes per role, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub original: u64,
    pub replaced: u64,
}

impl TtlPolicy {
    /// Zero means "use the built-in default" for that role.
    pub fn new(original: u64, replaced: u64) -> Self {
        Self {
            original: if original == 0 { DEFAULT_ORIGINAL_TTL } else { original },
            replaced: if replaced == 0 { DEFAULT_REPLACED_TTL } else { replaced },
        }
    }

    pub fn default_for(&self, role: SourceRole) -> u64 {
        match role {
            SourceRole::Original => self.original,
            SourceRole::Replaced => self.replaced,
        }
    }

    /// A response `max-age` wins over the role default.
    pub fn resolve(&self, role: SourceRole, max_age: Option<u64>) -> u64 {
        max_age.unwrap_or_else(|| self.default_for(role))
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGINAL_TTL, DEFAULT_REPLACED_TTL)
    }
}

/// Extracts `max-age` from a `Cache-Control` header value.
///
/// `max-age=0` is returned as `Some(0)`; the store raises it to its one
/// second minimum.
pub fn parse_max_age(header: &str) -> Option<u64> {
    header.split(',').find_map(|directive| {
        let (name, value) = directive.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("max-age") {
            return None;
        }
        value
            .trim()
            .trim_matches('"')
            .parse::<u64>()
            .ok()
    })
}

// == Fetcher ==
pub struct Fetcher {
    cache: Arc<RwLock<CacheStore>>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(
        cache: Arc<RwLock<CacheStore>>,
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            cache,
            transport,
            retry,
        }
    }

    pub fn cache(&self) -> &Arc<RwLock<CacheStore>> {
        &self.cache
    }

    // == Fetch ==
    /// Returns the payload for `url` as a base64 data URI.
    ///
    /// Served from cache while the entry is live; otherwise fetched with the
    /// retry policy and cached for the resolved TTL. A rejected cache write
    /// is logged and does not fail the fetch.
    pub async fn fetch(&self, url: &str, role: SourceRole, ttl: TtlPolicy) -> Result<String> {
        if let Some(cached) = self.cache.write().await.get(url) {
            debug!("Cache hit for {} ({})", url, role);
            return Ok(cached);
        }
        debug!("Cache miss for {} ({})", url, role);

        let (payload, max_age) = self
            .retry
            .run(&format!("fetch {}", url), || self.fetch_once(url))
            .await?;

        let ttl_seconds = ttl.resolve(role, max_age);
        if let Err(err) = self
            .cache
            .write()
            .await
            .set(url, payload.clone(), ttl_seconds)
        {
            warn!("Ignoring cache write failure for {}: {}", url, err);
        }

        Ok(payload)
    }

    /// Like `fetch`, but returns the decoded bytes.
    pub async fn fetch_bytes(&self, url: &str, role: SourceRole, ttl: TtlPolicy) -> Result<Vec<u8>> {
        let payload = self.fetch(url, role, ttl).await?;
        let (_, bytes) = data_uri::decode(&payload)?;
        Ok(bytes)
    }

    async fn fetch_once(&self, url: &str) -> Result<(String, Option<u64>)> {
        let response: TransportResponse = self.transport.get(url).await?;

        if !response.is_success() {
            return Err(LogoError::network(
                url,
                format!("HTTP status {}", response.status),
            ));
        }
        if response.body.is_empty() {
            return Err(LogoError::EmptyResource(url.to_string()));
        }

        let mime = data_uri::media_type(response.content_type.as_deref(), &response.body);
        let max_age = response.cache_control.as_deref().and_then(parse_max_age);

        Ok((data_uri::encode(&response.body, &mime), max_age))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::fetch::Backoff;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const URL: &str = "https://cdn.example.com/logos/7";

    /// Replays canned responses in order; repeats the last one when exhausted.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<TransportResponse>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<TransportResponse>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<TransportResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front()
                } else {
                    script.front().map(|r| match r {
                        Ok(resp) => Ok(resp.clone()),
                        Err(_) => Err(LogoError::network(url, "scripted failure")),
                    })
                }
            };
            next.unwrap_or_else(|| Err(LogoError::network(url, "empty script")))
        }
    }

    fn fetcher_with(
        transport: Arc<ScriptedTransport>,
        clock: ManualClock,
        max_payload: usize,
    ) -> Fetcher {
        let cache = CacheStore::with_clock(100, max_payload, Arc::new(clock));
        Fetcher::new(
            Arc::new(RwLock::new(cache)),
            transport,
            RetryPolicy::new(3, Duration::from_millis(1), Backoff::Exponential),
        )
    }

    fn png_response() -> TransportResponse {
        TransportResponse::ok(b"logo-bytes".to_vec()).with_content_type("image/png")
    }

    #[test]
    fn test_parse_max_age() {
        assert_eq!(parse_max_age("max-age=3600"), Some(3600));
        assert_eq!(parse_max_age("public, max-age=60, immutable"), Some(60));
        assert_eq!(parse_max_age("public, s-maxage=10"), None);
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("max-age=0"), Some(0));
        assert_eq!(parse_max_age("max-age=abc"), None);
    }

    #[test]
    fn test_ttl_policy_resolution() {
        let policy = TtlPolicy::new(0, 0);
        assert_eq!(policy.original, DEFAULT_ORIGINAL_TTL);
        assert_eq!(policy.replaced, DEFAULT_REPLACED_TTL);

        let policy = TtlPolicy::new(120, 7200);
        assert_eq!(policy.resolve(SourceRole::Original, None), 120);
        assert_eq!(policy.resolve(SourceRole::Replaced, None), 7200);
        assert_eq!(policy.resolve(SourceRole::Replaced, Some(30)), 30);
    }

    #[tokio::test]
    async fn test_fetch_caches_payload() {
        let transport = ScriptedTransport::new(vec![Ok(png_response())]);
        let clock = ManualClock::new(1_000);
        let fetcher = fetcher_with(transport.clone(), clock, 1024);

        let first = fetcher
            .fetch(URL, SourceRole::Replaced, TtlPolicy::default())
            .await
            .unwrap();
        let second = fetcher
            .fetch(URL, SourceRole::Replaced, TtlPolicy::default())
            .await
            .unwrap();

        assert_eq!(first, data_uri::encode(b"logo-bytes", "image/png"));
        assert_eq!(first, second);
        assert_eq!(transport.calls(), 1, "second fetch is served from cache");

        let cache = fetcher.cache().read().await;
        let entry = cache.entry(URL).unwrap();
        assert_eq!(entry.expires_at - entry.stored_at, DEFAULT_REPLACED_TTL as i64);
    }

    #[tokio::test]
    async fn test_fetch_uses_role_default_ttl() {
        let transport = ScriptedTransport::new(vec![Ok(png_response())]);
        let fetcher = fetcher_with(transport, ManualClock::new(0), 1024);

        fetcher
            .fetch(URL, SourceRole::Original, TtlPolicy::new(90, 900))
            .await
            .unwrap();

        let cache = fetcher.cache().read().await;
        assert_eq!(cache.entry(URL).unwrap().expires_at, 90);
    }

    #[tokio::test]
    async fn test_fetch_header_max_age_overrides_default() {
        let transport = ScriptedTransport::new(vec![Ok(
            png_response().with_cache_control("public, max-age=45")
        )]);
        let fetcher = fetcher_with(transport, ManualClock::new(0), 1024);

        fetcher
            .fetch(URL, SourceRole::Replaced, TtlPolicy::default())
            .await
            .unwrap();

        let cache = fetcher.cache().read().await;
        assert_eq!(cache.entry(URL).unwrap().expires_at, 45);
    }

    #[tokio::test]
    async fn test_fetch_zero_max_age_is_not_reused() {
        let transport = ScriptedTransport::new(vec![Ok(
            png_response().with_cache_control("no-store, max-age=0")
        )]);
        let clock = ManualClock::new(0);
        let fetcher = fetcher_with(transport.clone(), clock.clone(), 1024);

        fetcher
            .fetch(URL, SourceRole::Replaced, TtlPolicy::default())
            .await
            .unwrap();
        assert_eq!(fetcher.cache().read().await.entry(URL).unwrap().expires_at, 1);

        clock.advance(1);
        fetcher
            .fetch(URL, SourceRole::Replaced, TtlPolicy::default())
            .await
            .unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_refetches_after_expiry() {
        let transport = ScriptedTransport::new(vec![Ok(png_response())]);
        let clock = ManualClock::new(0);
        let fetcher = fetcher_with(transport.clone(), clock.clone(), 1024);
        let ttl = TtlPolicy::new(60, 60);

        fetcher.fetch(URL, SourceRole::Original, ttl).await.unwrap();
        clock.advance(61);
        fetcher.fetch(URL, SourceRole::Original, ttl).await.unwrap();

        assert_eq!(transport.calls(), 2);
        let cache = fetcher.cache().read().await;
        assert_eq!(cache.entry(URL).unwrap().stored_at, 61);
    }

    #[tokio::test]
    async fn test_fetch_retries_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Err(LogoError::network(URL, "connection refused")),
            Ok(TransportResponse::status(503)),
            Ok(png_response()),
        ]);
        let fetcher = fetcher_with(transport.clone(), ManualClock::new(0), 1024);

        let payload = fetcher
            .fetch(URL, SourceRole::Replaced, TtlPolicy::default())
            .await;

        assert!(payload.is_ok());
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_budget() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::status(404))]);
        let fetcher = fetcher_with(transport.clone(), ManualClock::new(0), 1024);

        let result = fetcher
            .fetch(URL, SourceRole::Original, TtlPolicy::default())
            .await;

        assert!(matches!(result, Err(LogoError::Network { .. })));
        assert_eq!(transport.calls(), 3);
        assert!(fetcher.cache().read().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let transport = ScriptedTransport::new(vec![Ok(TransportResponse::ok(Vec::new()))]);
        let fetcher = fetcher_with(transport.clone(), ManualClock::new(0), 1024);

        let result = fetcher
            .fetch(URL, SourceRole::Original, TtlPolicy::default())
            .await;

        assert!(matches!(result, Err(LogoError::EmptyResource(_))));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_cache_write_failure_is_swallowed() {
        let transport = ScriptedTransport::new(vec![Ok(png_response())]);
        // Quota smaller than any encoded payload
        let fetcher = fetcher_with(transport.clone(), ManualClock::new(0), 8);

        let payload = fetcher
            .fetch(URL, SourceRole::Original, TtlPolicy::default())
            .await;

        assert!(payload.is_ok());
        let cache = fetcher.cache().read().await;
        assert!(cache.is_empty());
        assert_eq!(cache.stats().rejected_writes, 1);
    }

    #[tokio::test]
    async fn test_fetch_bytes_decodes_payload() {
        let transport = ScriptedTransport::new(vec![Ok(png_response())]);
        let fetcher = fetcher_with(transport, ManualClock::new(0), 1024);

        let bytes = fetcher
            .fetch_bytes(URL, SourceRole::Original, TtlPolicy::default())
            .await
            .unwrap();

        assert_eq!(bytes, b"logo-bytes");
    }
}
