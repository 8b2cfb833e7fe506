//! Pipeline orchestrator: ties dispatch → normalize → crawl → summarize →
//! assemble together (spec §2, §4.9), following the teacher's resource
//! discipline of owning each long-lived resource (backend's `reqwest::Client`,
//! the crawl enricher's `BrowserWrapper`) for exactly the run's duration and
//! closing it explicitly before returning (spec §5, §9).

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::crawl::{CrawlEnricher, CrawlOutcome};
use crate::error::DeepResearchError;
use crate::llm::{LlmClient, Promptable};
use crate::pipeline::assembler::assemble;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::dispatcher::dispatch;
use crate::pipeline::normalizer::normalize;
use crate::pipeline::state::{PipelineState, StateTracker};
use crate::pipeline::summarizer::summarize_all;
use crate::pipeline::types::{ImageRef, PipelineInput};
use crate::search::Query;

/// Generic over the LLM client so tests can substitute a stub `Promptable`
/// in place of a live rig-core client and drive the summarizer stage
/// without a network call. `Pipeline::new` fixes `C` to the real
/// `LlmClient`; `Pipeline::with_llm_client` is the injection point.
pub struct Pipeline<C: Promptable + Clone + Send + Sync + 'static = LlmClient> {
    config: PipelineConfig,
    llm: C,
}

impl Pipeline<LlmClient> {
    pub fn new(config: PipelineConfig) -> Self {
        let llm = config.llm_client();
        Self { config, llm }
    }
}

impl<C: Promptable + Clone + Send + Sync + 'static> Pipeline<C> {
    /// Builds a pipeline against an already-constructed LLM client,
    /// bypassing `PipelineConfig::llm_client`'s rig-core construction —
    /// the seam integration tests use to stub the summarizer stage.
    pub fn with_llm_client(config: PipelineConfig, llm: C) -> Self {
        Self { config, llm }
    }

    /// Runs the pipeline once for `input`, returning the assembled text
    /// (spec §6 "Pipeline output"). Cancelling `cancel` at any point causes
    /// the run to proceed to `Done` carrying whatever partial result had
    /// accumulated (spec §4.9).
    pub async fn run(
        &self,
        input: PipelineInput,
        cancel: CancellationToken,
    ) -> Result<String, DeepResearchError> {
        let (tracker, _state_rx) = StateTracker::new();

        let backend = self.config.backend();
        let options = self.config.query_options();
        let queries: Vec<Query> = input
            .queries
            .iter()
            .map(|text| Query {
                text: text.clone(),
                topic: input.topic,
                max_results: input.max_results,
                include_raw_content: input.include_raw_content,
            })
            .collect();

        tracker.transition(PipelineState::Dispatching);
        let responses = dispatch(
            &backend,
            &queries,
            &options,
            self.config.inter_query_delay(),
            &cancel,
        )
        .await;

        tracker.transition(PipelineState::Normalizing);
        let (mut unique, mut images) = normalize(&queries[..responses.len()], &responses);

        if !backend.delivers_raw_content() && !unique.is_empty() && !cancel.is_cancelled() {
            tracker.transition(PipelineState::Crawling);
            enrich_with_crawl(&self.config, &mut unique, &mut images, &cancel).await;
        } else {
            info!(
                skipped_crawl = true,
                "crawl enricher skipped (SearchAndCrawl backend or empty result set)"
            );
        }

        tracker.transition(PipelineState::Summarizing);
        let summaries = summarize_all(
            &self.llm,
            &unique,
            self.config.max_content_length,
            self.config.max_structured_output_retries,
            &cancel,
        )
        .await;

        tracker.transition(PipelineState::Assembling);
        let text = assemble(&input, &queries, &responses, &unique, &summaries, &images);

        backend.close().await;
        tracker.transition(PipelineState::Done);

        Ok(text)
    }
}

async fn enrich_with_crawl(
    config: &PipelineConfig,
    unique: &mut crate::pipeline::types::UniqueResultSet,
    images: &mut Vec<ImageRef>,
    cancel: &CancellationToken,
) {
    let enricher = match CrawlEnricher::launch(config.crawl_timeout(), config.crawl_content_threshold).await {
        Ok(enricher) => enricher,
        Err(err) => {
            tracing::warn!(error = %err, "failed to launch crawl enricher, falling back to backend snippets only");
            return;
        }
    };

    let urls = unique.urls();
    let outcomes = tokio::select! {
        outcomes = enricher.crawl_all(&urls) => outcomes,
        _ = cancel.cancelled() => Vec::new(),
    };

    for (url, outcome) in urls.iter().zip(outcomes.into_iter()) {
        if let CrawlOutcome::Success(page) = outcome {
            if let Some(entry) = unique.get_mut(url) {
                entry.raw_content = Some(page.markdown);
                if entry.title.trim().is_empty() {
                    entry.title = page.title.clone();
                }
            }
            for image_url in page.images {
                images.push(ImageRef {
                    image_url,
                    source_title: unique.get(url).map(|e| e.title.clone()).unwrap_or_default(),
                    source_page_url: url.clone(),
                });
            }
        }
    }

    enricher.close().await;
}
