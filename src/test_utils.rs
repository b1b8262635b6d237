//! Test utilities for Guardchat
//!
//! In-memory backends that record every call, plus helpers for building
//! routers around them.

use crate::backends::{BackendKind, ClassificationResult, ClassifierBackend, Stats, Verdict};
use crate::error::{GuardchatError, Result};
use crate::router::FallbackRouter;
use crate::transport::TransportDescriptor;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Number of calls per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub classify: usize,
    pub fetch_stats: usize,
    pub flag: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.classify + self.fetch_stats + self.flag
    }
}

/// Scriptable in-memory backend
pub struct FakeBackend {
    kind: BackendKind,
    failing: AtomicBool,
    classification: Mutex<ClassificationResult>,
    stats: Mutex<Stats>,
    counts: Mutex<CallCounts>,
    prompts: Mutex<Vec<String>>,
    flagged: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            failing: AtomicBool::new(false),
            classification: Mutex::new(ClassificationResult::new(
                format!("{}-id", kind),
                Verdict::Safe,
                0.99,
                0.01,
            )),
            stats: Mutex::new(Stats::default()),
            counts: Mutex::new(CallCounts::default()),
            prompts: Mutex::new(Vec::new()),
            flagged: Mutex::new(Vec::new()),
        }
    }

    /// Every operation fails with a transport error
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_classification(self, result: ClassificationResult) -> Self {
        *self.classification.lock().unwrap() = result;
        self
    }

    pub fn with_stats(self, stats: Stats) -> Self {
        *self.stats.lock().unwrap() = stats;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_stats(&self, stats: Stats) {
        *self.stats.lock().unwrap() = stats;
    }

    pub fn calls(&self) -> CallCounts {
        *self.counts.lock().unwrap()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn flagged(&self) -> Vec<String> {
        self.flagged.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GuardchatError::transport(self.kind, "simulated failure").into());
        }
        Ok(())
    }
}

#[async_trait]
impl ClassifierBackend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn classify(&self, prompt: &str) -> Result<ClassificationResult> {
        self.counts.lock().unwrap().classify += 1;
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.check()?;
        Ok(self.classification.lock().unwrap().clone())
    }

    async fn fetch_stats(&self) -> Result<Stats> {
        self.counts.lock().unwrap().fetch_stats += 1;
        self.check()?;
        Ok(*self.stats.lock().unwrap())
    }

    async fn flag(&self, id: &str) -> Result<()> {
        self.counts.lock().unwrap().flag += 1;
        self.check()?;
        self.flagged.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

/// REST-only router around a fake REST backend
pub fn rest_only_router(rest: &Arc<FakeBackend>) -> Arc<FallbackRouter> {
    let descriptor = TransportDescriptor::resolve(&crate::config::TransportConfig::default());
    let rest: Arc<dyn ClassifierBackend> = rest.clone();
    Arc::new(FallbackRouter::with_backends(descriptor, None, rest).unwrap())
}

/// GraphQL-primary router around two fake backends
pub fn dual_router(graphql: &Arc<FakeBackend>, rest: &Arc<FakeBackend>) -> Arc<FallbackRouter> {
    let mut cfg = crate::config::TransportConfig::default();
    cfg.graphql.endpoint = Some("https://gql.example.com/graphql".to_string());
    let descriptor = TransportDescriptor::resolve(&cfg);
    let graphql: Arc<dyn ClassifierBackend> = graphql.clone();
    let rest: Arc<dyn ClassifierBackend> = rest.clone();
    Arc::new(FallbackRouter::with_backends(descriptor, Some(graphql), rest).unwrap())
}
