pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Base URLs of the three remote services a run talks to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub model_base: String,
    pub search_url: String,
    pub docs_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            model_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            search_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            docs_base: "https://docs.googleapis.com/v1/documents".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every service at one server, e.g. a local mock.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            model_base: format!("{base}/v1beta"),
            search_url: format!("{base}/customsearch/v1"),
            docs_base: format!("{base}/v1/documents"),
        }
    }

    pub fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.model_base.trim_end_matches('/'),
            model
        )
    }
}
