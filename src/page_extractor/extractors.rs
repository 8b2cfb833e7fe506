//! Page metadata extraction via a single JS evaluation round trip.

use anyhow::{Context, Result};
use chromiumoxide::Page;

use super::js_scripts::EXTRACT_METADATA_JS;
use super::schema::PageMetadata;

/// Evaluates `EXTRACT_METADATA_JS` and deserializes the result directly into
/// `PageMetadata`. Mirrors the document.title inline-evaluation pattern in
/// `page_info.rs`, generalized to a structured multi-field result.
pub async fn extract_metadata(page: Page) -> Result<PageMetadata> {
    let value = page
        .evaluate(EXTRACT_METADATA_JS)
        .await
        .context("Failed to evaluate metadata extraction script")?
        .into_value::<PageMetadata>()
        .context("Failed to deserialize page metadata")?;

    Ok(value)
}
