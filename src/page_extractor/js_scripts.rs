//! JavaScript snippets evaluated in-page by `extractors`.
//!
//! Kept as `const` strings rather than files on disk so the crate has no
//! runtime asset dependency, matching the inline `page.evaluate("...")`
//! calls already used in `page_info.rs` for `document.title`.

/// Collects meta-tag and OpenGraph metadata into a single JSON object so it
/// can be fetched with one round trip instead of one `evaluate` per field.
pub const EXTRACT_METADATA_JS: &str = r#"
(() => {
  const byName = (name) => {
    const el = document.querySelector(`meta[name="${name}"]`);
    return el ? el.getAttribute('content') : null;
  };
  const byProperty = (property) => {
    const el = document.querySelector(`meta[property="${property}"]`);
    return el ? el.getAttribute('content') : null;
  };
  return {
    description: byName('description') || byProperty('og:description'),
    og_title: byProperty('og:title'),
    og_image: byProperty('og:image'),
    author: byName('author'),
    published_time: byProperty('article:published_time'),
  };
})()
"#;
