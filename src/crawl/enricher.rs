use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chromiumoxide::Page;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::browser::{BrowserWrapper, launch_browser};
use crate::crawl::prune::{prune_markdown, strip_excluded_tags};
use crate::error::CrawlError;
use crate::page_extractor::extract_page_info;

/// Outcome of a single URL's crawl task.
pub enum CrawlOutcome {
    Success(CrawledPage),
    TimedOut,
    Failed(CrawlError),
}

pub struct CrawledPage {
    pub url: String,
    pub title: String,
    pub markdown: String,
    /// Image URLs harvested from the markdown body, capped at 5 per page
    /// (spec §3 ImageRef: "crawl-extracted: ≤5 per page").
    pub images: Vec<String>,
}

/// Owns one browser context for the duration of a crawl pass. Constructed
/// fresh per pipeline run and closed at the end of `crawl_all` regardless of
/// outcome (spec §5: "the browser context is per-crawl-enricher and closed
/// when enrichment ends").
pub struct CrawlEnricher {
    wrapper: BrowserWrapper,
    per_url_timeout: Duration,
    content_threshold: f32,
}

impl CrawlEnricher {
    pub async fn launch(
        per_url_timeout: Duration,
        content_threshold: f32,
    ) -> anyhow::Result<Self> {
        let (browser, handler, user_data_dir) = launch_browser().await?;
        Ok(Self {
            wrapper: BrowserWrapper::new(browser, handler, user_data_dir),
            per_url_timeout,
            content_threshold,
        })
    }

    /// Crawls every URL in parallel inside the shared browser context,
    /// returning outcomes in the same order as `urls` (positional alignment
    /// required by the Normalizer/Assembler downstream, spec §5).
    pub async fn crawl_all(&self, urls: &[String]) -> Vec<CrawlOutcome> {
        let start = Instant::now();
        let success = Arc::new(AtomicUsize::new(0));
        let failure = Arc::new(AtomicUsize::new(0));

        let mut set: JoinSet<(usize, CrawlOutcome)> = JoinSet::new();
        for (idx, url) in urls.iter().cloned().enumerate() {
            let browser = self.wrapper.browser().clone();
            let timeout = self.per_url_timeout;
            let threshold = self.content_threshold;
            let success = success.clone();
            let failure = failure.clone();

            set.spawn(async move {
                info!(url = %url, "crawl start");
                let outcome =
                    match tokio::time::timeout(timeout, crawl_one(&browser, &url, threshold)).await
                    {
                        Ok(Ok(page)) => {
                            info!(url = %url, chars = page.markdown.len(), "crawl success");
                            success.fetch_add(1, Ordering::Relaxed);
                            CrawlOutcome::Success(page)
                        }
                        Ok(Err(err)) => {
                            warn!(url = %url, error = %err, "crawl error");
                            failure.fetch_add(1, Ordering::Relaxed);
                            CrawlOutcome::Failed(err)
                        }
                        Err(_) => {
                            warn!(url = %url, timeout = ?timeout, "crawl timeout");
                            failure.fetch_add(1, Ordering::Relaxed);
                            CrawlOutcome::TimedOut
                        }
                    };
                (idx, outcome)
            });
        }

        let mut outcomes: Vec<Option<CrawlOutcome>> = (0..urls.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            if let Ok((idx, outcome)) = joined {
                outcomes[idx] = Some(outcome);
            }
        }

        let elapsed = start.elapsed().as_secs_f64().max(f64::EPSILON);
        let total = success.load(Ordering::Relaxed) + failure.load(Ordering::Relaxed);
        info!(
            success = success.load(Ordering::Relaxed),
            failure = failure.load(Ordering::Relaxed),
            pages_per_second = total as f64 / elapsed,
            "crawl enrichment complete"
        );

        outcomes
            .into_iter()
            .map(|o| o.unwrap_or(CrawlOutcome::TimedOut))
            .collect()
    }

    /// Explicit teardown, mirroring `BrowserManager::shutdown`'s two-step
    /// close-then-wait sequence so the Chrome process does not zombie.
    pub async fn close(mut self) {
        let _ = self.wrapper.browser_mut().close().await;
        let _ = self.wrapper.browser_mut().wait().await;
        self.wrapper.cleanup_temp_dir();
    }
}

async fn crawl_one(
    browser: &chromiumoxide::Browser,
    url: &str,
    content_threshold: f32,
) -> std::result::Result<CrawledPage, CrawlError> {
    let page: Page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| CrawlError::NavigationFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    page.goto(url)
        .await
        .map_err(|e| CrawlError::NavigationFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    page.wait_for_navigation()
        .await
        .map_err(|e| CrawlError::NavigationFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let info = extract_page_info(page.clone())
        .await
        .map_err(|e| CrawlError::NavigationFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let html = page
        .content()
        .await
        .map_err(|e| CrawlError::NavigationFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let _ = page.close().await;

    let html = strip_excluded_tags(&html);
    let raw_markdown = html2md::parse_html(&html);
    let markdown = prune_markdown(&raw_markdown, content_threshold);

    if markdown.trim().is_empty() {
        return Err(CrawlError::EmptyContent {
            url: url.to_string(),
        });
    }

    let images = extract_markdown_images(&markdown, 5);

    Ok(CrawledPage {
        url: url.to_string(),
        title: info.title,
        markdown,
        images,
    })
}

/// Extracts `![alt](url)` image references from markdown, capped at `limit`
/// per page (spec §3, §4.3).
fn extract_markdown_images(markdown: &str, limit: usize) -> Vec<String> {
    let mut images = Vec::new();
    let mut rest = markdown;

    while images.len() < limit {
        let Some(bang_paren) = rest.find("![") else {
            break;
        };
        let after = &rest[bang_paren + 2..];
        let Some(close_bracket) = after.find(']') else {
            break;
        };
        let after_bracket = &after[close_bracket + 1..];
        if !after_bracket.starts_with('(') {
            rest = after_bracket;
            continue;
        }
        let Some(close_paren) = after_bracket.find(')') else {
            break;
        };
        let url = &after_bracket[1..close_paren];
        if !url.is_empty() {
            images.push(url.to_string());
        }
        rest = &after_bracket[close_paren + 1..];
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harvests_up_to_limit_images() {
        let markdown = "![a](u1.png) text ![b](u2.png) ![c](u3.png) ![d](u4.png)";
        let images = extract_markdown_images(markdown, 2);
        assert_eq!(images, vec!["u1.png".to_string(), "u2.png".to_string()]);
    }

    #[test]
    fn ignores_malformed_image_syntax() {
        let markdown = "![broken] (not-a-link) ![ok](real.png)";
        let images = extract_markdown_images(markdown, 5);
        assert_eq!(images, vec!["real.png".to_string()]);
    }
}
