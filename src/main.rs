//! Thin CLI binary driving the Deep Research Search Pipeline for one query
//! and printing the assembled text to stdout (spec §6 "Pipeline input" /
//! "Pipeline output", SPEC_FULL §6 "CLI").

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use kodegen_deep_research::pipeline::{Pipeline, PipelineConfig, PipelineInput};
use kodegen_deep_research::search::Topic as SearchTopic;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TopicArg {
    General,
    News,
    Finance,
}

impl From<TopicArg> for SearchTopic {
    fn from(value: TopicArg) -> Self {
        match value {
            TopicArg::General => SearchTopic::General,
            TopicArg::News => SearchTopic::News,
            TopicArg::Finance => SearchTopic::Finance,
        }
    }
}

/// Runs the deep-research search pipeline once for the given queries and
/// prints the assembled document (sources + image inventory + embedded
/// search log) to stdout.
#[derive(Debug, Parser)]
#[command(name = "kodegen-deep-research", version, about)]
struct Cli {
    /// One or more search queries to run in sequence.
    #[arg(required = true)]
    queries: Vec<String>,

    /// Topic hint shaping default time range and result categories.
    #[arg(long, value_enum, default_value = "general")]
    topic: TopicArg,

    /// Maximum results requested per query from the backend.
    #[arg(long, default_value_t = 5)]
    max_results: u32,

    /// Ask the backend to include full raw page content when it supports it.
    #[arg(long)]
    include_raw_content: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env().context("loading pipeline configuration")?;

    info!(queries = ?cli.queries, "starting deep research pipeline run");

    let input = PipelineInput {
        queries: cli.queries,
        max_results: cli.max_results,
        topic: cli.topic.into(),
        include_raw_content: cli.include_raw_content,
    };

    let pipeline = Pipeline::new(config);
    let output = pipeline
        .run(input, CancellationToken::new())
        .await
        .context("running deep research pipeline")?;

    println!("{output}");

    Ok(())
}
