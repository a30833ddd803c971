//! Aggregator
//!
//! Turns one generation request into one response envelope. For every
//! requested exercise type it builds the prompt, calls the generation
//! client, normalizes the reply, and tags the resulting exercises. A
//! failing type contributes nothing; the request fails only when no
//! exercise at all was produced.
//!
//! Dropping the future returned by [`ExerciseGenerator::generate`] (for
//! example when the HTTP caller disconnects) cancels every in-flight call
//! and abandons the remaining types.

use crate::{
    catalog::{AgeGroup, Catalog, ExerciseTypeDefinition},
    exercise::{Exercise, ExerciseContent},
    generation::{GenerationClient, GenerationError},
    normalizer::normalize,
    prompt::{CONNECTION_TEST_PROMPT, PromptError, build_prompt},
    request::{ExerciseCount, GenerationRequest, RequestError, ResolvedRequest},
};
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_TYPE_DEADLINE: Duration = Duration::from_secs(90);

/// Identifies an exercise type in response metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseTypeRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    pub age_group: AgeGroup,
    /// Every type that was attempted, in request order, including those
    /// that produced nothing.
    pub exercise_types: Vec<ExerciseTypeRef>,
    pub total_count: usize,
    pub generated_at: DateTime<Utc>,
}

/// The merged result of one generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub exercises: Vec<Exercise>,
    pub metadata: EnvelopeMetadata,
}

/// Why one exercise type contributed no exercises.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TypeFailureReason {
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeFailure {
    pub type_id: String,
    pub message: String,
    #[serde(skip)]
    pub reason: TypeFailureReason,
}

impl TypeFailure {
    fn new(type_id: &str, reason: TypeFailureReason) -> Self {
        Self {
            type_id: type_id.to_string(),
            message: reason.to_string(),
            reason,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),
    /// Every requested type failed or came back empty.
    #[error("no exercises could be generated ({} type(s) failed)", failures.len())]
    Exhausted { failures: Vec<TypeFailure> },
}

/// Orchestrates exercise generation across exercise types.
pub struct ExerciseGenerator {
    catalog: Arc<Catalog>,
    client: Arc<dyn GenerationClient>,
    concurrency: usize,
    type_deadline: Duration,
}

impl ExerciseGenerator {
    pub fn new(catalog: Arc<Catalog>, client: Arc<dyn GenerationClient>) -> Self {
        Self {
            catalog,
            client,
            concurrency: DEFAULT_CONCURRENCY,
            type_deadline: DEFAULT_TYPE_DEADLINE,
        }
    }

    /// Maximum number of exercise types generated at the same time. `1`
    /// processes types strictly one after another.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Upper bound on the time spent on one exercise type, retries included.
    pub fn with_type_deadline(mut self, deadline: Duration) -> Self {
        self.type_deadline = deadline;
        self
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ResponseEnvelope, GenerateError> {
        let resolved = self.catalog.resolve(request)?;
        self.generate_resolved(&resolved).await
    }

    /// Generates for a request the caller already resolved against the
    /// catalog.
    pub async fn generate_resolved(
        &self,
        resolved: &ResolvedRequest<'_>,
    ) -> Result<ResponseEnvelope, GenerateError> {
        let age_group = resolved.age_group;
        let count = resolved.count;

        info!(
            age_group = %age_group.id,
            types = ?resolved.exercise_types.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            count = count.get(),
            "Generating exercises"
        );

        // `buffered` yields results in input order regardless of which
        // call finishes first.
        let pending: Vec<_> = resolved
            .exercise_types
            .iter()
            .map(|&definition| self.generate_for_type(definition, age_group, count))
            .collect();
        let outcomes: Vec<Result<Vec<Exercise>, TypeFailure>> =
            stream::iter(pending)
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut exercises = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(batch) => exercises.extend(batch),
                Err(failure) => failures.push(failure),
            }
        }

        if exercises.is_empty() {
            warn!(failed = failures.len(), "No exercises generated for any type");
            return Err(GenerateError::Exhausted { failures });
        }

        info!(
            total = exercises.len(),
            failed_types = failures.len(),
            "Exercises generated"
        );

        Ok(ResponseEnvelope {
            metadata: EnvelopeMetadata {
                age_group: age_group.clone(),
                exercise_types: resolved
                    .exercise_types
                    .iter()
                    .map(|d| ExerciseTypeRef {
                        id: d.id.clone(),
                        name: d.name.clone(),
                    })
                    .collect(),
                total_count: exercises.len(),
                generated_at: Utc::now(),
            },
            exercises,
        })
    }

    async fn generate_for_type(
        &self,
        definition: &ExerciseTypeDefinition,
        age_group: &AgeGroup,
        count: ExerciseCount,
    ) -> Result<Vec<Exercise>, TypeFailure> {
        let fail = |reason: TypeFailureReason| {
            warn!(type_id = %definition.id, error = %reason, "Exercise type failed, skipping");
            TypeFailure::new(&definition.id, reason)
        };

        let prompt = build_prompt(definition, age_group, count).map_err(|e| fail(e.into()))?;

        let raw = tokio::time::timeout(self.type_deadline, self.client.generate(&prompt))
            .await
            .unwrap_or(Err(GenerationError::Timeout))
            .map_err(|e| fail(e.into()))?;

        let normalized = normalize(&raw);
        let is_fallback = normalized.is_fallback();
        if is_fallback {
            warn!(type_id = %definition.id, "Model response for type was not valid JSON");
        }

        Ok(normalized
            .exercises
            .into_iter()
            .map(|value| {
                Exercise::tagged(
                    definition,
                    ExerciseContent::from_value(definition.kind, value, is_fallback),
                )
            })
            .collect())
    }

    /// Sends a fixed test prompt and reports whether any exercise came back.
    pub async fn test_connection(&self) -> bool {
        let result =
            tokio::time::timeout(self.type_deadline, self.client.generate(CONNECTION_TEST_PROMPT))
                .await
                .unwrap_or(Err(GenerationError::Timeout));
        match result {
            Ok(raw) => !normalize(&raw).exercises.is_empty(),
            Err(e) => {
                warn!(error = %e, "Connection test failed");
                false
            }
        }
    }
}
