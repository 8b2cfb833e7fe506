//! Result Normalizer (spec §4.3, spec §3): deduplicates results by URL
//! across all queries, attaches the originating query, and harvests
//! backend-declared images. Image cap precedence (DESIGN.md Open Question
//! (c)): backend images are pushed here, before any crawl-extracted images,
//! so a post-concatenation truncation at assembly time keeps backend images
//! first.

use crate::pipeline::types::{ImageRef, UniqueResult, UniqueResultSet};
use crate::search::{BackendResponse, Query};

pub fn normalize(queries: &[Query], responses: &[BackendResponse]) -> (UniqueResultSet, Vec<ImageRef>) {
    let mut set = UniqueResultSet::new();
    let mut images = Vec::new();

    for (query, response) in queries.iter().zip(responses.iter()) {
        for result in &response.results {
            let inserted = set.insert_if_absent(UniqueResult {
                url: result.url.clone(),
                title: result.title.clone(),
                content: result.content.clone(),
                raw_content: result.raw_content.clone(),
                origin_query: query.text.clone(),
                score: result.score,
                published_date: result.published_date.clone(),
            });

            // A later occurrence of an already-seen URL is discarded as a
            // Result but may still contribute an image (spec §3).
            let _ = inserted;

            if let Some(img) = &result.img_src {
                images.push(ImageRef {
                    image_url: img.clone(),
                    source_title: result.title.clone(),
                    source_page_url: result.url.clone(),
                });
            }
        }

        if let Some(response_images) = &response.images {
            for img in response_images {
                images.push(ImageRef {
                    image_url: img.clone(),
                    source_title: query.text.clone(),
                    source_page_url: String::new(),
                });
            }
        }
    }

    (set, images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Result as SearchResult, Topic};

    fn query(text: &str) -> Query {
        Query {
            text: text.to_string(),
            topic: Topic::General,
            max_results: 5,
            include_raw_content: false,
        }
    }

    fn result(url: &str, title: &str) -> SearchResult {
        SearchResult {
            url: url.to_string(),
            title: title.to_string(),
            content: format!("snippet for {url}"),
            raw_content: None,
            score: None,
            img_src: None,
            published_date: None,
        }
    }

    fn response(query: &str, results: Vec<SearchResult>) -> BackendResponse {
        BackendResponse {
            query: query.to_string(),
            results,
            answer: None,
            images: None,
            follow_up_questions: None,
            error: None,
            response_time: None,
        }
    }

    #[test]
    fn dedupes_overlapping_urls_preserving_first_seen_order() {
        let queries = vec![query("q1"), query("q2")];
        let responses = vec![
            response("q1", vec![result("https://a.com", "A"), result("https://b.com", "B")]),
            response("q2", vec![result("https://b.com", "B again"), result("https://c.com", "C")]),
        ];

        let (set, _images) = normalize(&queries, &responses);

        assert_eq!(set.len(), 3);
        assert_eq!(set.urls(), vec!["https://a.com", "https://b.com", "https://c.com"]);
        // First occurrence wins: title stays "B", not "B again".
        assert_eq!(set.get("https://b.com").unwrap().title, "B");
        assert_eq!(set.get("https://b.com").unwrap().origin_query, "q1");
    }

    #[test]
    fn harvests_backend_img_src_and_response_images() {
        let mut with_image = result("https://a.com", "A");
        with_image.img_src = Some("https://a.com/thumb.png".to_string());

        let mut resp = response("q1", vec![with_image]);
        resp.images = Some(vec!["https://a.com/banner.png".to_string()]);

        let (_, images) = normalize(&[query("q1")], &[resp]);

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].image_url, "https://a.com/thumb.png");
        assert_eq!(images[1].image_url, "https://a.com/banner.png");
    }
}
