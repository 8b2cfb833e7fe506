//! Boilerplate pruning for crawled pages.
//!
//! Ported from the Crawl4AI configuration in
//! `examples/original_source/open_deep_research-main/.../utils.py`:
//! word-count threshold 10, excluded tags {header, footer, iframe, nav},
//! a fixed-threshold content filter (default 0.3). The crate has no
//! dependency on Python's crawl4ai, so this reimplements the same pass in
//! two stages: `strip_excluded_tags` removes the excluded elements (and
//! everything inside them) from the raw HTML *before* `html2md::parse_html`
//! runs, since html2md drops tag names on conversion — matching on literal
//! `<header>`-style text after conversion would never find anything to
//! remove (every `html2md::parse_html` call site in the pack, e.g.
//! `examples/cyrup-ai-kodegen-tools-browser/src/utils/deep_research.rs:297`,
//! confirms tags don't survive). `prune_markdown` then does the
//! word-count/link-ratio pass over the resulting markdown.

use once_cell::sync::Lazy;
use regex::Regex;

const WORD_COUNT_THRESHOLD: usize = 10;
const EXCLUDED_TAGS: [&str; 4] = ["header", "footer", "iframe", "nav"];

static EXCLUDED_TAG_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    EXCLUDED_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("excluded-tag regex is a fixed, valid pattern")
        })
        .collect()
});

/// Removes `{header, footer, iframe, nav}` elements (tag and contents) from
/// raw HTML before it is handed to `html2md::parse_html` (spec §4.3).
pub fn strip_excluded_tags(html: &str) -> String {
    let mut stripped = html.to_string();
    for pattern in EXCLUDED_TAG_PATTERNS.iter() {
        stripped = pattern.replace_all(&stripped, "").into_owned();
    }
    stripped
}

/// Prunes low-signal blocks from already-HTML→markdown-converted text.
///
/// `threshold` follows the Crawl4AI `PruningContentFilter` convention: a
/// higher threshold keeps more content (it tolerates more link-heavy
/// boilerplate); the default of 0.3 is fairly aggressive.
pub fn prune_markdown(markdown: &str, threshold: f32) -> String {
    let link_ratio_cap = 1.0 - threshold.clamp(0.0, 1.0);

    markdown
        .lines()
        .filter(|line| keep_block(line, link_ratio_cap))
        .collect::<Vec<_>>()
        .join("\n")
}

fn keep_block(line: &str, link_ratio_cap: f32) -> bool {
    let word_count = line.split_whitespace().count();
    if word_count == 0 {
        // Preserve blank lines for readability; they carry no signal to prune.
        return true;
    }
    if word_count < WORD_COUNT_THRESHOLD {
        return false;
    }

    let link_chars: usize = line
        .match_indices("](")
        .map(|(pos, _)| {
            line[..pos]
                .rfind('[')
                .map(|start| pos - start)
                .unwrap_or(0)
        })
        .sum();
    let total_chars = line.len().max(1);
    let ratio = link_chars as f32 / total_chars as f32;

    ratio <= link_ratio_cap
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_short_lines_below_word_threshold() {
        let markdown = "Nav\n\nThis paragraph definitely has more than ten words in it, clearly.";
        let pruned = prune_markdown(markdown, 0.3);
        assert!(!pruned.contains("Nav"));
        assert!(pruned.contains("definitely has more than ten words"));
    }

    #[test]
    fn strips_excluded_tags_from_raw_html_before_conversion() {
        let html = "<header><nav>Site Nav Links Here</nav></header><body><p>Real body copy that easily clears the word count floor for retention.</p></body>";
        let stripped = strip_excluded_tags(html);
        assert!(!stripped.contains("Site Nav Links Here"));

        let markdown = html2md::parse_html(&stripped);
        let pruned = prune_markdown(&markdown, 0.3);
        assert!(!pruned.contains("Site Nav"));
        assert!(pruned.contains("Real body copy"));
    }

    #[test]
    fn strips_iframe_and_footer_with_attributes() {
        let html = r#"<iframe src="https://ads.example/slot" width="300"></iframe><footer class="site-footer">Copyright notice and legal links here</footer><p>Meaningful article content that clears the word count threshold easily.</p>"#;
        let stripped = strip_excluded_tags(html);
        assert!(!stripped.contains("ads.example"));
        assert!(!stripped.contains("Copyright notice"));
        assert!(stripped.contains("Meaningful article content"));
    }
}
