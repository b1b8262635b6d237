//! GraphQL backend implementation for Guardchat
//!
//! Speaks the managed data API: every operation is a single `POST` of
//! `{query, variables, operationName}` to the configured endpoint, with the
//! API key sent as `x-api-key` when one is configured.
//!
//! The API uses camelCase field names (`predictedClass`, `processingTime`,
//! `userFlaggedIncorrect`), and the stats query returns an `AWSJSON` scalar
//! that may arrive either as an embedded JSON string or as an object.

use crate::backends::{BackendKind, ClassificationResult, ClassifierBackend, Stats, Verdict};
use crate::error::{GuardchatError, Result};
use crate::transport::GraphqlEndpoint;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Named query returning the aggregated usage statistics
pub const GET_STATS_QUERY: &str = "query GetStats { Stats }";

/// Mutation marking a stored record as incorrectly classified
pub const FLAG_MUTATION: &str = "mutation FlagTrainingData($input: UpdateTrainingDataInput!) { \
updateTrainingData(input: $input) { id userFlaggedIncorrect } }";

/// Mutation classifying a prompt through the managed API
pub const CLASSIFY_MUTATION: &str = "mutation ClassifyPrompt($prompt: String!) { \
classifyPrompt(prompt: $prompt) { id predictedClass label confidence processingTime } }";

const API_KEY_HEADER: &str = "x-api-key";

/// Managed GraphQL API backend
pub struct GraphqlBackend {
    client: Client,
    endpoint: GraphqlEndpoint,
}

/// GraphQL request envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlRequest<'a> {
    query: &'a str,
    operation_name: &'a str,
    variables: Value,
}

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    message: String,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlClassification {
    id: String,
    predicted_class: i64,
    #[serde(default)]
    label: Option<String>,
    confidence: f64,
    processing_time: f64,
}

/// Stats payload; accepts both camelCase and the service's snake_case keys
#[derive(Debug, Deserialize)]
struct GraphqlStats {
    #[serde(alias = "totalPrompts")]
    total_prompts: u64,
    #[serde(alias = "safeCount")]
    safe_count: u64,
    #[serde(alias = "misuseCount")]
    misuse_count: u64,
    #[serde(default, alias = "flaggedCount")]
    flagged_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlaggedRecord {
    id: String,
    #[serde(default)]
    user_flagged_incorrect: Option<bool>,
}

impl GraphqlBackend {
    /// Create a new GraphQL backend for a resolved endpoint
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(endpoint: GraphqlEndpoint, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("guardchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GuardchatError::from)?;

        tracing::info!(
            "Initialized GraphQL backend: endpoint={}, region={}, api_key={}",
            endpoint.url,
            endpoint.region,
            if endpoint.api_key.is_some() { "set" } else { "none" }
        );

        Ok(Self { client, endpoint })
    }

    fn error(message: impl Into<String>) -> anyhow::Error {
        GuardchatError::transport(BackendKind::Graphql, message).into()
    }

    /// Execute one operation and return the named field of `data`
    async fn execute<T>(
        &self,
        operation_name: &str,
        query: &str,
        variables: Value,
        field: &str,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let request = GraphqlRequest {
            query,
            operation_name,
            variables,
        };

        let mut builder = self.client.post(self.endpoint.url.as_str()).json(&request);
        if let Some(key) = &self.endpoint.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        tracing::debug!("Sending GraphQL operation {}", operation_name);

        let response = builder.send().await.map_err(|e| {
            tracing::warn!("GraphQL {} request failed: {}", operation_name, e);
            Self::error(format!("{} request failed: {}", operation_name, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("GraphQL endpoint returned error {}: {}", status, body);
            return Err(Self::error(format!(
                "{} returned {}: {}",
                operation_name, status, body
            )));
        }

        let envelope: GraphqlResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse GraphQL {} response: {}", operation_name, e);
            Self::error(format!("malformed {} response: {}", operation_name, e))
        })?;

        if !envelope.errors.is_empty() {
            let messages: Vec<String> = envelope
                .errors
                .iter()
                .map(|e| match &e.error_type {
                    Some(kind) => format!("{} ({})", e.message, kind),
                    None => e.message.clone(),
                })
                .collect();
            tracing::error!("GraphQL {} errors: {}", operation_name, messages.join("; "));
            return Err(Self::error(format!(
                "{} failed: {}",
                operation_name,
                messages.join("; ")
            )));
        }

        let value = envelope
            .data
            .and_then(|mut data| data.get_mut(field).map(Value::take))
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                Self::error(format!("{} response has no `{}` data", operation_name, field))
            })?;

        serde_json::from_value(value).map_err(|e| {
            Self::error(format!("malformed {} payload: {}", operation_name, e))
        })
    }
}

/// Decode an `AWSJSON` scalar that may be a JSON string or a JSON value
fn decode_aws_json<T: DeserializeOwned>(value: Value) -> std::result::Result<T, serde_json::Error> {
    match value {
        Value::String(raw) => serde_json::from_str(&raw),
        other => serde_json::from_value(other),
    }
}

#[async_trait]
impl ClassifierBackend for GraphqlBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Graphql
    }

    async fn classify(&self, prompt: &str) -> Result<ClassificationResult> {
        let body: GraphqlClassification = self
            .execute(
                "ClassifyPrompt",
                CLASSIFY_MUTATION,
                json!({ "prompt": prompt }),
                "classifyPrompt",
            )
            .await?;

        let predicted_class = Verdict::try_from(body.predicted_class).map_err(Self::error)?;
        let result = ClassificationResult {
            id: body.id,
            predicted_class,
            confidence: body.confidence,
            processing_time_seconds: body.processing_time,
            label: body.label,
        };

        if let Some(violation) = result.range_violation() {
            return Err(Self::error(format!("malformed classify payload: {}", violation)));
        }
        Ok(result)
    }

    async fn fetch_stats(&self) -> Result<Stats> {
        let raw: Value = self
            .execute("GetStats", GET_STATS_QUERY, json!({}), "Stats")
            .await?;

        let stats: GraphqlStats = decode_aws_json(raw)
            .map_err(|e| Self::error(format!("malformed GetStats payload: {}", e)))?;

        Ok(Stats {
            total_prompts: stats.total_prompts,
            safe_count: stats.safe_count,
            misuse_count: stats.misuse_count,
            flagged_count: stats.flagged_count,
        })
    }

    async fn flag(&self, id: &str) -> Result<()> {
        let record: FlaggedRecord = self
            .execute(
                "FlagTrainingData",
                FLAG_MUTATION,
                json!({ "input": { "id": id, "userFlaggedIncorrect": true } }),
                "updateTrainingData",
            )
            .await?;

        if record.user_flagged_incorrect == Some(false) {
            return Err(Self::error(format!(
                "record {} was not marked as flagged",
                record.id
            )));
        }

        tracing::debug!("GraphQL flagged classification {}", record.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_aws_json_string() {
        let raw = Value::String(
            r#"{"total_prompts":4,"safe_count":3,"misuse_count":1,"flagged_count":2}"#.to_string(),
        );
        let stats: GraphqlStats = decode_aws_json(raw).unwrap();
        assert_eq!(stats.total_prompts, 4);
        assert_eq!(stats.flagged_count, 2);
    }

    #[test]
    fn test_decode_aws_json_object_camel_case() {
        let raw = json!({"totalPrompts": 2, "safeCount": 1, "misuseCount": 1});
        let stats: GraphqlStats = decode_aws_json(raw).unwrap();
        assert_eq!(stats.safe_count, 1);
        assert_eq!(stats.flagged_count, 0);
    }

    #[test]
    fn test_request_envelope_shape() {
        let request = GraphqlRequest {
            query: GET_STATS_QUERY,
            operation_name: "GetStats",
            variables: json!({}),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["operationName"], "GetStats");
        assert_eq!(value["query"], GET_STATS_QUERY);
    }

    #[test]
    fn test_operation_documents_are_named() {
        assert!(GET_STATS_QUERY.starts_with("query GetStats"));
        assert!(FLAG_MUTATION.contains("userFlaggedIncorrect"));
        assert!(CLASSIFY_MUTATION.contains("processingTime"));
    }
}
