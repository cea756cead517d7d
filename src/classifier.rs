//! User-agent classification.
//!
//! Matching is case-insensitive substring containment of each catalog token,
//! tried in catalog declaration order; the first hit wins.

use std::sync::Arc;

use crate::signatures::SignatureCatalog;

/// A recognised crawler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Catalog token as declared (this is what gets stored)
    pub signature: String,
    /// Display name at classification time
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    catalog: Arc<SignatureCatalog>,
    lowered_tokens: Vec<String>,
}

impl Classifier {
    pub fn new(catalog: Arc<SignatureCatalog>) -> Self {
        let lowered_tokens = catalog
            .iter()
            .map(|signature| signature.token.to_lowercase())
            .collect();
        Self {
            catalog,
            lowered_tokens,
        }
    }

    pub fn catalog(&self) -> &SignatureCatalog {
        &self.catalog
    }

    /// Returns the first catalog token contained in `user_agent`.
    ///
    /// Empty or missing user agents never match.
    pub fn classify(&self, user_agent: Option<&str>) -> Option<&str> {
        let user_agent = user_agent?.trim();
        if user_agent.is_empty() {
            return None;
        }
        let lowered = user_agent.to_lowercase();

        self.lowered_tokens
            .iter()
            .zip(self.catalog.iter())
            .find(|(token, _)| lowered.contains(token.as_str()))
            .map(|(_, signature)| signature.token.as_str())
    }

    /// Like [`Classifier::classify`] but resolves the display name too.
    pub fn detect(&self, user_agent: Option<&str>) -> Option<Detection> {
        self.classify(user_agent).map(|token| Detection {
            signature: token.to_string(),
            display_name: self.catalog.display_name(token).to_string(),
        })
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Arc::new(SignatureCatalog::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::Signature;

    #[test]
    fn detects_known_crawlers() {
        let classifier = Classifier::default();

        assert_eq!(
            classifier.classify(Some("Mozilla/5.0 (compatible; GPTBot/1.0)")),
            Some("GPTBot")
        );
        assert_eq!(classifier.classify(Some("ClaudeBot/1.0")), Some("ClaudeBot"));
        assert_eq!(classifier.classify(Some("Mozilla/5.0 (Macintosh)")), None);
    }

    #[test]
    fn matching_ignores_case() {
        let classifier = Classifier::default();

        assert_eq!(classifier.classify(Some("mozilla gptbot/1.1")), Some("GPTBot"));
        assert_eq!(classifier.classify(Some("CCBOT/2.0")), Some("CCBot"));
        assert_eq!(
            classifier.classify(Some("Mozilla/5.0 Claude-Web/1.0")),
            Some("claude-web")
        );
    }

    #[test]
    fn empty_or_missing_user_agent_is_no_match() {
        let classifier = Classifier::default();

        assert_eq!(classifier.classify(None), None);
        assert_eq!(classifier.classify(Some("")), None);
        assert_eq!(classifier.classify(Some("   ")), None);
    }

    #[test]
    fn first_declared_token_wins() {
        // Both tokens are substrings of the agent; declaration order decides.
        let catalog = SignatureCatalog::new(vec![
            Signature {
                token: "Applebot".into(),
                name: "Apple".into(),
            },
            Signature {
                token: "Applebot-Extended".into(),
                name: "Apple Intelligence".into(),
            },
        ])
        .unwrap();
        let classifier = Classifier::new(Arc::new(catalog));

        assert_eq!(
            classifier.classify(Some("Applebot-Extended/0.1")),
            Some("Applebot")
        );

        let defaults = Classifier::default();
        assert_eq!(
            defaults.classify(Some("GPTBot via ChatGPT-User")),
            Some("GPTBot")
        );
    }

    #[test]
    fn every_default_token_is_detected() {
        let classifier = Classifier::default();
        for signature in classifier.catalog().iter() {
            let agent = format!("Mozilla/5.0 (compatible; {}/1.0)", signature.token);
            assert_eq!(
                classifier.classify(Some(&agent)),
                Some(signature.token.as_str()),
                "agent {agent}"
            );
        }
    }

    #[test]
    fn detect_resolves_display_name() {
        let detection = Classifier::default()
            .detect(Some("ClaudeBot/1.0"))
            .unwrap();

        assert_eq!(detection.signature, "ClaudeBot");
        assert_eq!(detection.display_name, "Anthropic Claude");
    }
}
