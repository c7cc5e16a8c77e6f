//! Query pipeline: plan, retrieve, then answer and reflect concurrently.

use crate::embeddings::create_provider;
use crate::generator::AnswerGenerator;
use crate::index::DocumentIndex;
use crate::planner::IntentPlanner;
use crate::reflector::Reflector;
use crate::retriever::Retriever;
use crate::types::{PipelineResult, QueryRequest, Role};
use chrono::{SecondsFormat, Utc};
use regiguard_core::{AppConfig, AppError, AppResult};
use regiguard_llm::create_client;
use regiguard_prompt::{load_prompt, ANSWER_PROMPT_ID};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Summary of one answered query, handed to the observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    /// Returned to the caller as `PipelineResult::query_id`
    pub query_id: String,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub question: String,
    pub role: String,
    pub top_docs: Vec<String>,
    /// `id@version` per returned document
    pub doc_versions: Vec<String>,
    pub relevance: f32,
    pub ok: bool,
    pub intent: String,
    pub latency_secs: f64,
}

/// Receives a log entry after every successful query.
///
/// Called on a detached task; errors are logged and never reach the caller.
#[async_trait::async_trait]
pub trait QueryObserver: Send + Sync {
    async fn record(&self, entry: QueryLogEntry) -> AppResult<()>;
}

/// Emits one structured `info` event per query.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

#[async_trait::async_trait]
impl QueryObserver for TracingObserver {
    async fn record(&self, entry: QueryLogEntry) -> AppResult<()> {
        tracing::info!(
            target: "regiguard::query_log",
            query_id = %entry.query_id,
            timestamp = %entry.timestamp,
            question = %entry.question,
            role = %entry.role,
            top_docs = ?entry.top_docs,
            doc_versions = ?entry.doc_versions,
            relevance = entry.relevance,
            ok = entry.ok,
            intent = %entry.intent,
            latency_secs = entry.latency_secs,
            "query"
        );
        Ok(())
    }
}

/// The answering pipeline. Holds no per-request state; share it behind `Arc`.
pub struct Pipeline {
    planner: IntentPlanner,
    retriever: Retriever,
    generator: AnswerGenerator,
    reflector: Reflector,
    observer: Arc<dyn QueryObserver>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("planner", &self.planner)
            .field("retriever", &self.retriever)
            .field("generator", &self.generator)
            .field("reflector", &self.reflector)
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        planner: IntentPlanner,
        retriever: Retriever,
        generator: AnswerGenerator,
        reflector: Reflector,
    ) -> Self {
        Self {
            planner,
            retriever,
            generator,
            reflector,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Wire every component from configuration: the workspace index, the
    /// completion client, the answer prompt and the reflection embedder.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let index = DocumentIndex::open(config).await?;
        Self::from_index(config, Arc::new(index)).await
    }

    /// Same as `from_config` around an already opened index.
    pub async fn from_index(config: &AppConfig, index: Arc<DocumentIndex>) -> AppResult<Self> {
        let api_key = config.resolve_api_key();

        let retriever = Retriever::new(index).with_oversample(config.retrieval.oversample);

        let client = create_client(
            &config.provider,
            config.llm.endpoint.as_deref(),
            api_key.as_deref(),
            Duration::from_secs(config.llm.timeout_secs),
        )?;

        let prompt = load_prompt(&config.workspace, ANSWER_PROMPT_ID)?;

        let generator = AnswerGenerator::new(client, config.model.clone())
            .with_prompt(prompt)
            .with_timeout(Duration::from_secs(config.llm.timeout_secs))
            .with_max_tokens(config.llm.max_tokens);

        let reflection_embedder = create_provider(&config.reflection.embedder, api_key.as_deref())
            .await
            .map_err(|e| {
                AppError::Config(format!("Failed to initialize reflection embedder: {}", e))
            })?;

        let reflector = Reflector::new(reflection_embedder)
            .with_threshold(config.reflection.threshold)
            .with_timeout(Duration::from_secs(config.reflection.timeout_secs));

        Ok(Self::new(IntentPlanner::new(), retriever, generator, reflector))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer `question` for `role` from at most `k` documents.
    ///
    /// Any retrieval, generation or reflection failure fails the whole call.
    pub async fn run(&self, question: &str, role: Role, k: usize) -> AppResult<PipelineResult> {
        let start = Instant::now();

        if k == 0 {
            return Err(AppError::Validation("k must be greater than zero".to_string()));
        }
        if question.trim().is_empty() {
            return Err(AppError::Validation("question must not be empty".to_string()));
        }

        let plan = self.planner.plan(question);
        let docs = self.retriever.retrieve(question, role, k).await?;

        let (answer, reflection) = tokio::try_join!(
            self.generator.answer(question, &docs),
            self.reflector.reflect(question, &docs)
        )?;

        let result = PipelineResult {
            query_id: uuid::Uuid::new_v4().to_string(),
            plan,
            docs,
            answer,
            relevance: reflection.relevance,
            ok: reflection.ok,
        };

        let entry = QueryLogEntry {
            query_id: result.query_id.clone(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            question: question.to_string(),
            role: role.to_string(),
            top_docs: result.docs.iter().map(|d| d.id.clone()).collect(),
            doc_versions: result
                .docs
                .iter()
                .map(|d| format!("{}@{}", d.id, d.version))
                .collect(),
            relevance: result.relevance,
            ok: result.ok,
            intent: result.plan.intent.clone(),
            latency_secs: start.elapsed().as_secs_f64(),
        };

        let observer = Arc::clone(&self.observer);
        tokio::spawn(async move {
            if let Err(e) = observer.record(entry).await {
                tracing::warn!(error = %e, "Query observer failed");
            }
        });

        tracing::info!(
            query_id = %result.query_id,
            intent = %result.plan.intent,
            docs = result.docs.len(),
            relevance = result.relevance,
            ok = result.ok,
            "Query answered"
        );

        Ok(result)
    }

    /// Parse a query contract request and run it.
    pub async fn handle(&self, request: QueryRequest) -> AppResult<PipelineResult> {
        let role: Role = request.role.parse()?;

        if request.k <= 0 {
            return Err(AppError::Validation(format!(
                "k must be greater than zero, got {}",
                request.k
            )));
        }

        let k = usize::try_from(request.k)
            .map_err(|_| AppError::Validation(format!("k out of range: {}", request.k)))?;

        self.run(&request.question, role, k).await
    }
}
