//! Model and access resolution, and per-service rate limiting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::model::ModelDescriptor;
use crate::types::Access;
use crate::Error;

/// A model together with everything needed to reach its vendor.
#[derive(Clone)]
pub struct ResolvedModel {
    pub model: ModelDescriptor,
    pub access: Access,
    pub rate_limiter: Option<Arc<dyn ChatRateLimiter>>,
}

impl std::fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("model", &self.model.id)
            .field("dialect", &self.access.dialect())
            .field("rate_limited", &self.rate_limiter.is_some())
            .finish()
    }
}

/// Resolves a model id to its descriptor and vendor access.
#[async_trait::async_trait]
pub trait ModelResolver: Send + Sync {
    async fn resolve(&self, model_id: &str) -> Result<ResolvedModel, Error>;
}

/// Vendor-supplied throttle awaited before each generation.
#[async_trait::async_trait]
pub trait ChatRateLimiter: Send + Sync {
    async fn acquire(&self, model: &ModelDescriptor);
}

/// Spaces generations for one service at least `min_interval` apart.
///
/// Only a completed `acquire` claims a start; an abandoned wait leaves no
/// trace on later callers.
pub struct MinIntervalRateLimiter {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl MinIntervalRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// A limiter allowing at most `requests` generations per minute.
    pub fn per_minute(requests: u32) -> Self {
        Self::new(Duration::from_secs(60) / requests.max(1))
    }
}

#[async_trait::async_trait]
impl ChatRateLimiter for MinIntervalRateLimiter {
    async fn acquire(&self, model: &ModelDescriptor) {
        loop {
            let wake = {
                let mut last_start = self.last_start.lock().await;
                let now = Instant::now();
                match *last_start {
                    Some(last) if now < last + self.min_interval => last + self.min_interval,
                    _ => {
                        *last_start = Some(now);
                        return;
                    }
                }
            };

            let wait = wake.saturating_duration_since(Instant::now());
            tracing::debug!(model = %model.id, wait_ms = wait.as_millis() as u64, "rate limiting chat generation");
            // re-check after waking, another caller may have taken the slot
            tokio::time::sleep_until(wake).await;
        }
    }
}

struct ServiceEntry {
    access: Access,
    rate_limiter: Option<Arc<dyn ChatRateLimiter>>,
}

/// In-memory model registry.
#[derive(Default)]
pub struct StaticModelRegistry {
    models: HashMap<String, ModelDescriptor>,
    services: HashMap<String, ServiceEntry>,
}

impl StaticModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the access configuration of a vendor service.
    pub fn with_service(mut self, service_id: impl Into<String>, access: Access) -> Self {
        self.services.insert(
            service_id.into(),
            ServiceEntry {
                access,
                rate_limiter: None,
            },
        );
        self
    }

    /// Register a vendor service whose generations go through a rate limiter.
    pub fn with_rate_limited_service(
        mut self,
        service_id: impl Into<String>,
        access: Access,
        rate_limiter: Arc<dyn ChatRateLimiter>,
    ) -> Self {
        self.services.insert(
            service_id.into(),
            ServiceEntry {
                access,
                rate_limiter: Some(rate_limiter),
            },
        );
        self
    }

    pub fn with_model(mut self, model: ModelDescriptor) -> Self {
        self.models.insert(model.id.clone(), model);
        self
    }
}

#[async_trait::async_trait]
impl ModelResolver for StaticModelRegistry {
    async fn resolve(&self, model_id: &str) -> Result<ResolvedModel, Error> {
        let model = self
            .models
            .get(model_id)
            .ok_or_else(|| Error::ModelNotAvailable(model_id.to_string()))?;
        let service = self.services.get(&model.service_id).ok_or_else(|| {
            Error::config(format!(
                "No access configured for service '{}' of model {model_id}",
                model.service_id
            ))
        })?;

        Ok(ResolvedModel {
            model: model.clone(),
            access: service.access.clone(),
            rate_limiter: service.rate_limiter.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OpenAIAccess;
    use tokio_test::{assert_pending, assert_ready, task};

    fn registry() -> StaticModelRegistry {
        StaticModelRegistry::new()
            .with_service("openai-1", Access::OpenAI(OpenAIAccess::new("sk-test")))
            .with_model(ModelDescriptor::new("gpt-4o", "openai", "openai-1", "gpt-4o"))
            .with_model(ModelDescriptor::new("orphan", "openai", "missing", "gpt-4o"))
    }

    #[tokio::test]
    async fn test_resolve_known_model() {
        let resolved = registry().resolve("gpt-4o").await.unwrap();
        assert_eq!(resolved.model.id, "gpt-4o");
        assert!(resolved.access.as_openai().is_some());
        assert!(resolved.rate_limiter.is_none());
    }

    #[tokio::test]
    async fn test_resolution_failures_are_configuration_errors() {
        let unknown = registry().resolve("nope").await.unwrap_err();
        assert!(unknown.is_configuration());

        let orphan = registry().resolve("orphan").await.unwrap_err();
        assert!(orphan.is_configuration());
        assert!(orphan.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_min_interval_limiter_delays_second_call() {
        let limiter = MinIntervalRateLimiter::new(Duration::from_secs(30));
        let model = ModelDescriptor::new("gpt-4o", "openai", "openai-1", "gpt-4o");

        let mut first = task::spawn(limiter.acquire(&model));
        assert_ready!(first.poll());

        let mut second = task::spawn(limiter.acquire(&model));
        assert_pending!(second.poll());
    }

    #[test]
    fn test_per_minute_interval() {
        let limiter = MinIntervalRateLimiter::per_minute(15);
        assert_eq!(limiter.min_interval, Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_waits_do_not_push_back_later_callers() {
        let limiter = MinIntervalRateLimiter::new(Duration::from_millis(300));
        let model = ModelDescriptor::new("gpt-4o", "openai", "openai-1", "gpt-4o");

        let start = Instant::now();
        limiter.acquire(&model).await;
        for _ in 0..3 {
            let waited = tokio::time::timeout(Duration::from_millis(5), limiter.acquire(&model)).await;
            assert!(waited.is_err());
        }

        limiter.acquire(&model).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(320), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_callers_start_one_interval_apart() {
        let limiter = Arc::new(MinIntervalRateLimiter::new(Duration::from_millis(100)));
        let model = ModelDescriptor::new("gpt-4o", "openai", "openai-1", "gpt-4o");

        let start = Instant::now();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                let model = model.clone();
                tokio::spawn(async move {
                    limiter.acquire(&model).await;
                    start.elapsed()
                })
            })
            .collect();

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();
        assert!(starts[1] >= starts[0] + Duration::from_millis(100));
        assert!(starts[2] >= starts[1] + Duration::from_millis(100));
    }
}
