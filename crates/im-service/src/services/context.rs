//! Service context - dependency container for services
//!
//! Holds the repositories, cache stores, and configuration the services
//! need.

use std::sync::Arc;

use im_cache::{PresenceStore, PushStream, RateLimiter};
use im_common::{ImConfig, JwtService};
use im_core::traits::{MessageRepository, ThreadRepository};

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    threads: Arc<dyn ThreadRepository>,
    messages: Arc<dyn MessageRepository>,
    presence: PresenceStore,
    rate_limiter: RateLimiter,
    push_stream: PushStream,
    jwt_service: Arc<JwtService>,
    config: Arc<ImConfig>,
}

impl ServiceContext {
    /// Start building a service context
    #[must_use]
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::default()
    }

    /// Get the thread repository
    pub fn threads(&self) -> &dyn ThreadRepository {
        self.threads.as_ref()
    }

    /// Get the message repository
    pub fn messages(&self) -> &dyn MessageRepository {
        self.messages.as_ref()
    }

    /// Get the presence store
    pub fn presence(&self) -> &PresenceStore {
        &self.presence
    }

    /// Get the rate limiter
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Get the push stream
    pub fn push_stream(&self) -> &PushStream {
        &self.push_stream
    }

    /// Get the JWT service
    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Get the application configuration
    pub fn config(&self) -> &ImConfig {
        &self.config
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext").finish_non_exhaustive()
    }
}

/// Builder for [`ServiceContext`]
#[derive(Default)]
pub struct ServiceContextBuilder {
    threads: Option<Arc<dyn ThreadRepository>>,
    messages: Option<Arc<dyn MessageRepository>>,
    presence: Option<PresenceStore>,
    rate_limiter: Option<RateLimiter>,
    push_stream: Option<PushStream>,
    jwt_service: Option<Arc<JwtService>>,
    config: Option<Arc<ImConfig>>,
}

impl ServiceContextBuilder {
    #[must_use]
    pub fn threads(mut self, repo: Arc<dyn ThreadRepository>) -> Self {
        self.threads = Some(repo);
        self
    }

    #[must_use]
    pub fn messages(mut self, repo: Arc<dyn MessageRepository>) -> Self {
        self.messages = Some(repo);
        self
    }

    #[must_use]
    pub fn presence(mut self, store: PresenceStore) -> Self {
        self.presence = Some(store);
        self
    }

    #[must_use]
    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    #[must_use]
    pub fn push_stream(mut self, stream: PushStream) -> Self {
        self.push_stream = Some(stream);
        self
    }

    #[must_use]
    pub fn jwt_service(mut self, jwt: Arc<JwtService>) -> Self {
        self.jwt_service = Some(jwt);
        self
    }

    #[must_use]
    pub fn config(mut self, config: Arc<ImConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the context, failing on any missing dependency
    pub fn build(self) -> Result<ServiceContext, String> {
        Ok(ServiceContext {
            threads: self.threads.ok_or("missing thread repository")?,
            messages: self.messages.ok_or("missing message repository")?,
            presence: self.presence.ok_or("missing presence store")?,
            rate_limiter: self.rate_limiter.ok_or("missing rate limiter")?,
            push_stream: self.push_stream.ok_or("missing push stream")?,
            jwt_service: self.jwt_service.ok_or("missing jwt service")?,
            config: self.config.ok_or("missing config")?,
        })
    }
}
