//! Fallback routing between the two transports
//!
//! The router owns both backends and the resolved [`TransportDescriptor`].
//! Each operation is sent to the preferred backend; a transport failure there
//! is retried exactly once on the other backend. GraphQL is never contacted
//! when the descriptor says it is unconfigured.
//!
//! Calls are independent: no caching, deduplication, or concurrency limits,
//! so a stats refresh may run while a classification is in flight.

use crate::backends::{
    BackendKind, ClassificationResult, ClassifierBackend, GraphqlBackend, RestBackend, Stats,
};
use crate::error::{is_transport_error, GuardchatError, Result};
use crate::transport::TransportDescriptor;

use std::fmt;
use std::sync::Arc;

/// A logical operation the router can dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Classify a prompt
    Classify(String),
    /// Fetch the usage statistics snapshot
    FetchStats,
    /// Flag a classification id as incorrect
    Flag(String),
}

impl Operation {
    /// Short operation name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classify(_) => "classify",
            Self::FetchStats => "fetchStats",
            Self::Flag(_) => "flag",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of a dispatched [`Operation`]
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutput {
    /// Verdict returned by `classify`
    Classification(ClassificationResult),
    /// Snapshot returned by `fetchStats`
    Stats(Stats),
    /// Acknowledgement of `flag`
    Flagged,
}

/// Routes operations to the preferred backend with single-shot fallback
pub struct FallbackRouter {
    descriptor: Arc<TransportDescriptor>,
    graphql: Option<Arc<dyn ClassifierBackend>>,
    rest: Arc<dyn ClassifierBackend>,
}

impl FallbackRouter {
    /// Build the router and its HTTP backends from a resolved descriptor
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be created
    ///
    /// # Examples
    ///
    /// ```
    /// use guardchat::config::TransportConfig;
    /// use guardchat::router::FallbackRouter;
    /// use guardchat::transport::TransportDescriptor;
    ///
    /// let descriptor = TransportDescriptor::resolve(&TransportConfig::default());
    /// let router = FallbackRouter::new(descriptor).unwrap();
    /// assert!(!router.descriptor().graphql_configured());
    /// ```
    pub fn new(descriptor: TransportDescriptor) -> Result<Self> {
        let rest: Arc<dyn ClassifierBackend> =
            Arc::new(RestBackend::new(descriptor.rest().to_config())?);

        let graphql: Option<Arc<dyn ClassifierBackend>> = match descriptor.graphql() {
            Some(endpoint) => Some(Arc::new(GraphqlBackend::new(
                endpoint.clone(),
                descriptor.rest().timeout,
            )?)),
            None => None,
        };

        Self::with_backends(descriptor, graphql, rest)
    }

    /// Build a router around already constructed backends
    ///
    /// A GraphQL backend passed alongside a REST-only descriptor is dropped,
    /// so it can never be contacted.
    ///
    /// # Errors
    ///
    /// Returns error if the descriptor requires GraphQL but none is given
    pub fn with_backends(
        descriptor: TransportDescriptor,
        graphql: Option<Arc<dyn ClassifierBackend>>,
        rest: Arc<dyn ClassifierBackend>,
    ) -> Result<Self> {
        let graphql = if descriptor.graphql_configured() {
            match graphql {
                Some(backend) => Some(backend),
                None => {
                    return Err(GuardchatError::Config(
                        "GraphQL transport is configured but no GraphQL backend was supplied"
                            .to_string(),
                    )
                    .into())
                }
            }
        } else {
            if graphql.is_some() {
                tracing::debug!("Ignoring GraphQL backend: transport is unconfigured");
            }
            None
        };

        Ok(Self {
            descriptor: Arc::new(descriptor),
            graphql,
            rest,
        })
    }

    /// The descriptor this router was built from
    pub fn descriptor(&self) -> &TransportDescriptor {
        &self.descriptor
    }

    fn backend(&self, kind: BackendKind) -> Result<&dyn ClassifierBackend> {
        match kind {
            BackendKind::Rest => Ok(self.rest.as_ref()),
            BackendKind::Graphql => self.graphql.as_deref().ok_or_else(|| {
                GuardchatError::Config("GraphQL transport is unconfigured".to_string()).into()
            }),
        }
    }

    async fn call(backend: &dyn ClassifierBackend, op: &Operation) -> Result<OperationOutput> {
        match op {
            Operation::Classify(prompt) => backend
                .classify(prompt)
                .await
                .map(OperationOutput::Classification),
            Operation::FetchStats => backend.fetch_stats().await.map(OperationOutput::Stats),
            Operation::Flag(id) => backend.flag(id).await.map(|_| OperationOutput::Flagged),
        }
    }

    /// Dispatch an operation with fallback
    ///
    /// 1. Invoke the operation on the preferred backend.
    /// 2. On a transport error, invoke it once on the other backend (if any).
    /// 3. If that fails too, return [`GuardchatError::BothTransportsFailed`]
    ///    carrying the fallback's error.
    ///
    /// Non-transport errors are returned as-is without fallback.
    pub async fn execute(&self, op: Operation) -> Result<OperationOutput> {
        let primary_kind = self.descriptor.primary();
        let primary = self.backend(primary_kind)?;

        let primary_err = match Self::call(primary, &op).await {
            Ok(output) => return Ok(output),
            Err(e) => e,
        };

        if !is_transport_error(&primary_err) {
            return Err(primary_err);
        }

        let Some(fallback_kind) = self.descriptor.fallback() else {
            tracing::debug!("{} failed on {} with no fallback: {}", op, primary_kind, primary_err);
            return Err(primary_err);
        };

        // Distinguishes a reachable-but-failing GraphQL from an unconfigured one,
        // which never gets here.
        tracing::warn!(
            operation = op.name(),
            failed = %primary_kind,
            fallback = %fallback_kind,
            "Preferred transport failed, falling back: {}",
            primary_err
        );

        let fallback = self.backend(fallback_kind)?;
        match Self::call(fallback, &op).await {
            Ok(output) => {
                tracing::info!("{} served by fallback transport {}", op, fallback_kind);
                Ok(output)
            }
            Err(secondary_err) => {
                tracing::error!("{} failed on both transports: {}", op, secondary_err);
                match secondary_err.downcast::<GuardchatError>() {
                    Ok(secondary) => Err(GuardchatError::BothTransportsFailed {
                        primary: primary_err.to_string(),
                        secondary: Box::new(secondary),
                    }
                    .into()),
                    Err(other) => Err(other),
                }
            }
        }
    }

    /// Classify a prompt through the preferred transport, with fallback
    pub async fn classify(&self, prompt: &str) -> Result<ClassificationResult> {
        match self.execute(Operation::Classify(prompt.to_string())).await? {
            OperationOutput::Classification(result) => Ok(result),
            other => Err(unexpected_output("classify", &other)),
        }
    }

    /// Fetch stats through the preferred transport, with fallback
    pub async fn fetch_stats(&self) -> Result<Stats> {
        match self.execute(Operation::FetchStats).await? {
            OperationOutput::Stats(stats) => Ok(stats),
            other => Err(unexpected_output("fetchStats", &other)),
        }
    }

    /// Flag a classification through the preferred transport, with fallback
    pub async fn flag(&self, id: &str) -> Result<()> {
        match self.execute(Operation::Flag(id.to_string())).await? {
            OperationOutput::Flagged => Ok(()),
            other => Err(unexpected_output("flag", &other)),
        }
    }
}

fn unexpected_output(op: &str, output: &OperationOutput) -> anyhow::Error {
    anyhow::anyhow!("{} produced unexpected output: {:?}", op, output)
}
