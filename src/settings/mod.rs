//! Agent settings resolution
//!
//! Which model and system-prompt template apply to a user: a per-user
//! override wins, otherwise the single default record. Lookups go through
//! the [`SettingsStore`] trait so the resolver works against the database
//! client or an in-memory store.
//!
//! Caching is explicit: the resolver is constructed with a [`CachePolicy`]
//! and exposes single-entry invalidation (the `/refresh` chat command).
//! There is no ambient cache shared between resolvers.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::db::BuffetDb;
use crate::types::{AgentSettings, AppError, Result};

/// Read access to the settings records. Writes happen through an
/// administrative surface, never through the resolver.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn settings_for_user(&self, user_id: &str) -> Result<Option<AgentSettings>>;
    async fn default_settings(&self) -> Result<Option<AgentSettings>>;
}

#[async_trait]
impl SettingsStore for BuffetDb {
    async fn settings_for_user(&self, user_id: &str) -> Result<Option<AgentSettings>> {
        BuffetDb::settings_for_user(self, user_id).await
    }

    async fn default_settings(&self) -> Result<Option<AgentSettings>> {
        BuffetDb::default_settings(self).await
    }
}

/// Caching behavior for resolved settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Every resolve hits the store.
    None,
    /// Resolved settings are reused for the given duration.
    Ttl(Duration),
}

struct CachedSettings {
    settings: AgentSettings,
    fetched_at: Instant,
}

pub struct SettingsResolver {
    store: Arc<dyn SettingsStore>,
    policy: CachePolicy,
    cache: RwLock<HashMap<String, CachedSettings>>,
}

impl SettingsResolver {
    pub fn new(store: Arc<dyn SettingsStore>, policy: CachePolicy) -> Self {
        Self {
            store,
            policy,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Settings applying to a user: the per-user override when one exists,
    /// else the default record.
    pub async fn resolve(&self, user_id: &str) -> Result<AgentSettings> {
        if let CachePolicy::Ttl(ttl) = self.policy {
            let cache = self.cache.read();
            if let Some(entry) = cache.get(user_id) {
                if entry.fetched_at.elapsed() < ttl {
                    return Ok(entry.settings.clone());
                }
            }
        }

        let settings = self.fetch(user_id).await?;

        if matches!(self.policy, CachePolicy::Ttl(_)) {
            self.cache.write().insert(
                user_id.to_string(),
                CachedSettings {
                    settings: settings.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }

        Ok(settings)
    }

    async fn fetch(&self, user_id: &str) -> Result<AgentSettings> {
        if let Some(settings) = self.store.settings_for_user(user_id).await? {
            return Ok(settings);
        }

        self.store.default_settings().await?.ok_or_else(|| {
            AppError::Configuration(format!("No agent settings found for user '{}'", user_id))
        })
    }

    /// Drop one user's cached entry. Other users' entries are untouched.
    pub fn invalidate(&self, user_id: &str) {
        self.cache.write().remove(user_id);
    }
}

/// Settings store backed by process memory. Enforces the same
/// single-default rule as the database client.
#[derive(Default)]
pub struct InMemorySettingsStore {
    inner: RwLock<InMemoryInner>,
}

#[derive(Default)]
struct InMemoryInner {
    records: Vec<AgentSettings>,
    overrides: HashMap<String, i64>,
    next_id: i64,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, prompt: &str, model: &str, is_default: bool) -> Result<i64> {
        let mut inner = self.inner.write();

        if is_default && inner.records.iter().any(|r| r.is_default) {
            return Err(AppError::Validation(
                "Cannot have more than one default agent settings".to_string(),
            ));
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.push(AgentSettings {
            id,
            model: model.to_string(),
            prompt: prompt.to_string(),
            is_default,
        });

        Ok(id)
    }

    pub fn assign_to_user(&self, user_id: &str, settings_id: i64) {
        self.inner
            .write()
            .overrides
            .insert(user_id.to_string(), settings_id);
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn settings_for_user(&self, user_id: &str) -> Result<Option<AgentSettings>> {
        let inner = self.inner.read();
        Ok(inner
            .overrides
            .get(user_id)
            .and_then(|id| inner.records.iter().find(|r| r.id == *id))
            .cloned())
    }

    async fn default_settings(&self) -> Result<Option<AgentSettings>> {
        let inner = self.inner.read();
        Ok(inner.records.iter().find(|r| r.is_default).cloned())
    }
}
