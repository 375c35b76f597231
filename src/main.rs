//! `auditor [tickets.json]`: evaluate one batch session and print its summary.
//!
//! Tickets are a JSON array of `TicketInput`, read from the given file or stdin.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use mimalloc::MiMalloc;
use tokio_stream::StreamExt;

use auditor::batch::{BatchOrchestrator, BatchPhase, BatchSummary};
use auditor::config::Config;
use auditor::corpus::{CachedCorpus, InMemoryCorpus, QdrantCorpus, RuleCorpusStore};
use auditor::domain::TicketInput;
use auditor::embedding::HashedEmbedder;
use auditor::evaluator::Evaluator;
use auditor::llm::{GenaiModel, LanguageModel};
use auditor::retrieval::HybridRetriever;
use auditor::storage::{EvaluationStore, FileEvaluationStore};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    let tickets = read_tickets(std::env::args().nth(1).as_deref())?;
    let corpus_path = config.require_corpus_path()?.clone();
    let corpus = InMemoryCorpus::load_json(&corpus_path).await?;
    corpus.check_dimension(config.embedding_dim)?;

    tracing::info!(
        model = %config.model,
        tickets = tickets.len(),
        window = config.batch_window,
        qdrant = config.qdrant_url.is_some(),
        "Auditor starting"
    );

    let summary = match &config.qdrant_url {
        Some(url) => {
            let qdrant =
                QdrantCorpus::connect(url, &config.qdrant_collection, config.embedding_dim as u64)?;
            qdrant.health_check().await?;
            qdrant.ensure_collection().await?;
            qdrant.index_snapshot(corpus.snapshot()).await?;
            let cached = CachedCorpus::new(qdrant, config.corpus_cache_ttl);
            run_session(&config, cached, &tickets).await?
        }
        None => run_session(&config, corpus, &tickets).await?,
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn read_tickets(path: Option<&str>) -> anyhow::Result<Vec<TicketInput>> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("failed to read tickets from {path}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read tickets from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("tickets must be a JSON array of ticket inputs")
}

async fn run_session<S>(
    config: &Config,
    corpus: S,
    tickets: &[TicketInput],
) -> anyhow::Result<BatchSummary>
where
    S: RuleCorpusStore + 'static,
{
    let model: Arc<dyn LanguageModel> =
        Arc::new(GenaiModel::new(&config.model).with_timeout(config.model_timeout));
    let embedder = Arc::new(HashedEmbedder::new(config.embedding_dim)?);
    let retriever = HybridRetriever::new(Arc::new(corpus), embedder, config.retrieval_config());
    let store: Arc<dyn EvaluationStore> = Arc::new(FileEvaluationStore::new(&config.output_dir));

    let evaluator = Evaluator::new(model, retriever, store).with_config(config.evaluator_config());
    let orchestrator =
        BatchOrchestrator::new(Arc::new(evaluator)).with_window_size(config.batch_window);

    let mut progress = Box::pin(orchestrator.progress_stream());
    let reporter = tokio::spawn(async move {
        while let Some(event) = progress.next().await {
            let c = &event.counters;
            match event.phase {
                BatchPhase::Started { total, window_size } => {
                    tracing::info!(session_id = %event.session_id, total, window_size, "Session started");
                }
                BatchPhase::WindowCompleted { window, windows } => {
                    tracing::info!(
                        window,
                        windows,
                        completed = c.completed,
                        failed = c.failed,
                        percent = c.percent,
                        cost_usd = c.cost_usd,
                        "Progress"
                    );
                }
                BatchPhase::Completed { duration_ms } => {
                    tracing::info!(duration_ms, "Session finished");
                }
            }
        }
    });

    let session_id = uuid::Uuid::new_v4().to_string();
    let summary = orchestrator.run(&session_id, tickets).await;
    drop(orchestrator);
    reporter.await?;

    Ok(summary)
}
