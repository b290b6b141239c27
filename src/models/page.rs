use serde::{Deserialize, Serialize};

/// Campaign attribution read from the embedding page's query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
    pub source: String,
    pub medium: String,
    pub campaign: String,
    pub term: String,
    pub content: String,
}

impl UtmParams {
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("utm_source", self.source.clone()),
            ("utm_medium", self.medium.clone()),
            ("utm_campaign", self.campaign.clone()),
            ("utm_term", self.term.clone()),
            ("utm_content", self.content.clone()),
        ]
    }
}

/// Where the form is embedded, captured once at mount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub page_url: String,
    pub page_title: String,
    pub utm: UtmParams,
}
