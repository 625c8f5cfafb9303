//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use docextract_core::DocExtractConfig;
use docextract_gateway::Gateway;
use docextract_runtime::{ExtractionSession, Orchestrator};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Upper bound on how long an expired batch can linger between sweeps.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: DocExtractConfig,
    pub gateway: Arc<Gateway>,
    pub orchestrator: Orchestrator<Gateway>,
    /// Live batch sessions by id. In memory only; gone on restart. Settled
    /// sessions are evicted once older than `config.batch_ttl`.
    pub batches: RwLock<HashMap<String, Arc<ExtractionSession>>>,
}

impl AppState {
    pub fn new(config: DocExtractConfig, gateway: Gateway) -> Self {
        let gateway = Arc::new(gateway);
        Self {
            config,
            orchestrator: Orchestrator::new(gateway.clone()),
            gateway,
            batches: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: DocExtractConfig) -> docextract_core::Result<Self> {
        let gateway = Gateway::from_config(&config)?;
        Ok(Self::new(config, gateway))
    }

    pub fn insert_batch(&self, session: Arc<ExtractionSession>) {
        self.evict_expired(Instant::now());
        self.batches
            .write()
            .insert(session.id().to_string(), session);
    }

    pub fn batch(&self, id: &str) -> Option<Arc<ExtractionSession>> {
        self.batches.read().get(id).cloned()
    }

    pub fn remove_batch(&self, id: &str) -> Option<Arc<ExtractionSession>> {
        self.batches.write().remove(id)
    }

    /// Drop every batch that finished settling at least `batch_ttl` before
    /// `now`. Batches with files still processing are kept.
    pub fn evict_expired(&self, now: Instant) -> usize {
        let ttl = self.config.batch_ttl;
        let mut batches = self.batches.write();
        let before = batches.len();
        batches.retain(|_, session| match session.settled_at() {
            Some(settled) => now.saturating_duration_since(settled) < ttl,
            None => true,
        });
        let evicted = before - batches.len();
        if evicted > 0 {
            debug!("Evicted {} expired batch(es)", evicted);
        }
        evicted
    }
}

/// Periodically evict expired batches for the life of the server.
pub fn spawn_batch_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let period = state
        .config
        .batch_ttl
        .min(MAX_SWEEP_INTERVAL)
        .max(Duration::from_millis(10));
    info!("Batch sweeper running every {:?}", period);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            state.evict_expired(Instant::now());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(ttl: Duration) -> AppState {
        let config = DocExtractConfig {
            upstream_url: "http://127.0.0.1:9/extract".into(),
            batch_ttl: ttl,
            ..DocExtractConfig::default()
        };
        AppState::from_config(config).unwrap()
    }

    #[test]
    fn test_settled_batch_evicted_after_ttl() {
        let state = state(Duration::from_secs(30));
        let done = Arc::new(ExtractionSession::new(["a.pdf"]));
        done.fail(0, "bad key");
        let running = Arc::new(ExtractionSession::new(["b.pdf"]));
        state.insert_batch(done.clone());
        state.insert_batch(running.clone());

        let settled = done.settled_at().unwrap();
        assert_eq!(state.evict_expired(settled + Duration::from_secs(10)), 0);
        assert!(state.batch(done.id()).is_some());

        assert_eq!(state.evict_expired(settled + Duration::from_secs(31)), 1);
        assert!(state.batch(done.id()).is_none());
        assert!(state.batch(running.id()).is_some());
    }

    #[test]
    fn test_processing_batch_never_evicted() {
        let state = state(Duration::ZERO);
        let running = Arc::new(ExtractionSession::new(["a.pdf", "b.pdf"]));
        running.fail(0, "bad key");
        state.insert_batch(running.clone());

        let later = Instant::now() + Duration::from_secs(3600);
        assert_eq!(state.evict_expired(later), 0);
        assert!(state.batch(running.id()).is_some());
    }

    #[tokio::test]
    async fn test_sweeper_evicts_in_background() {
        let state = Arc::new(state(Duration::ZERO));
        let done = Arc::new(ExtractionSession::new(["a.pdf"]));
        done.fail(0, "bad key");
        state.batches.write().insert(done.id().to_string(), done.clone());

        let sweeper = spawn_batch_sweeper(state.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        sweeper.abort();

        assert!(state.batch(done.id()).is_none());
    }
}
