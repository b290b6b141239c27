use reqwest::Url;

use crate::models::{PageContext, UtmParams};

/// Captures the embedding page at mount: its URL, title and `utm_*` parameters.
pub fn page_context(page_url: &str, page_title: &str) -> PageContext {
    let utm = match Url::parse(page_url) {
        Ok(url) => utm_from_url(&url),
        Err(e) => {
            log::warn!("Unparseable page URL {page_url:?}: {e}");
            UtmParams::default()
        }
    };

    PageContext {
        page_url: page_url.to_string(),
        page_title: page_title.to_string(),
        utm,
    }
}

fn utm_from_url(url: &Url) -> UtmParams {
    let mut utm = UtmParams::default();
    for (key, value) in url.query_pairs() {
        let slot = match &*key {
            "utm_source" => &mut utm.source,
            "utm_medium" => &mut utm.medium,
            "utm_campaign" => &mut utm.campaign,
            "utm_term" => &mut utm.term,
            "utm_content" => &mut utm.content,
            _ => continue,
        };
        // first occurrence wins, like URLSearchParams.get
        if slot.is_empty() {
            *slot = value.into_owned();
        }
    }
    utm
}

/// Storage partition for a page, e.g. `https://example.com:8443`.
pub fn origin_of(page_url: &str) -> String {
    Url::parse(page_url)
        .map(|url| url.origin().ascii_serialization())
        .unwrap_or_else(|_| "null".to_string())
}
