//! Content safety validation.
//!
//! Publish-type actions pass their text through a validator before any
//! quota is consumed; a rejection is a normal, recoverable outcome that
//! must not touch the counter. The crate ships a keyword-based validator
//! rejecting prohibited outcome claims; deployments substitute their own
//! implementation behind the trait.

use serde::Serialize;

/// Verdict from a safety check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyVerdict {
    /// True when the content may be published.
    pub valid: bool,
    /// Reason for rejection, user-facing.
    pub reason: Option<String>,
}

impl SafetyVerdict {
    /// An accepting verdict.
    #[must_use]
    pub const fn accepted() -> Self {
        Self { valid: true, reason: None }
    }

    /// A rejecting verdict with a reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self { valid: false, reason: Some(reason.into()) }
    }
}

/// Validates content before publication.
pub trait ContentSafetyValidator: Send + Sync {
    /// Checks whether `text` may be published.
    fn validate(&self, text: &str) -> SafetyVerdict;
}

/// Keyword-based validator for prohibited claims.
///
/// Matching is case-insensitive on whole phrases. The default list covers
/// guaranteed-outcome claims that professional content on the platform
/// may not make.
#[derive(Debug, Clone)]
pub struct KeywordValidator {
    blocked: Vec<String>,
}

impl KeywordValidator {
    /// Creates a validator with a custom phrase list.
    #[must_use]
    pub fn new<I, S>(blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { blocked: blocked.into_iter().map(|s| s.into().to_lowercase()).collect() }
    }
}

impl Default for KeywordValidator {
    fn default() -> Self {
        Self::new([
            "guaranteed cure",
            "guaranteed results",
            "100% accurate",
            "miracle remedy",
            "cures cancer",
            "instant wealth",
        ])
    }
}

impl ContentSafetyValidator for KeywordValidator {
    fn validate(&self, text: &str) -> SafetyVerdict {
        let lowered = text.to_lowercase();
        for phrase in &self.blocked {
            if lowered.contains(phrase.as_str()) {
                return SafetyVerdict::rejected(format!(
                    "content contains a prohibited claim: \"{phrase}\""
                ));
            }
        }
        SafetyVerdict::accepted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_content_passes() {
        let validator = KeywordValidator::default();
        let verdict = validator.validate("Weekly horoscope: a good time for new beginnings.");
        assert!(verdict.valid);
        assert!(verdict.reason.is_none());
    }

    #[test]
    fn test_prohibited_claim_rejected() {
        let validator = KeywordValidator::default();
        let verdict = validator.validate("Our gemstones offer a GUARANTEED CURE for all ailments");
        assert!(!verdict.valid);
        assert!(verdict.reason.unwrap().contains("guaranteed cure"));
    }

    #[test]
    fn test_custom_phrase_list() {
        let validator = KeywordValidator::new(["forbidden phrase"]);
        assert!(!validator.validate("this has a Forbidden Phrase inside").valid);
        assert!(validator.validate("guaranteed cure").valid);
    }

    #[test]
    fn test_empty_content_passes() {
        let validator = KeywordValidator::default();
        assert!(validator.validate("").valid);
    }
}
