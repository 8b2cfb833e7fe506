//! Crawl Enricher (spec §4.3).
//!
//! Activated iff the selected backend is not SearchAndCrawl and the
//! UniqueResultSet is non-empty. Launches one shared browser context for
//! the run, then fans out one crawl task per URL, each wrapped in an
//! independent timeout. The fan-out shape mirrors
//! `utils/deep_research.rs::DeepResearch::research`'s `Semaphore` + `JoinSet`
//! pattern; the browser context itself is owned for the run by a
//! `BrowserWrapper` obtained via `browser_setup::launch_browser`, not the
//! process-global `BrowserManager` (the enricher wants its own context, torn
//! down at the end of enrichment rather than reused process-wide).

mod enricher;
mod prune;

pub use enricher::{CrawlEnricher, CrawlOutcome, CrawledPage};
pub use prune::prune_markdown;
