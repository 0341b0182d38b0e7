//! Safety filter — crisis-indicator short-circuit.
//!
//! First stage of the pipeline. A pure substring containment check against a
//! fixed indicator set, with a fixed response: deterministic, evaluable
//! offline, and reviewable as a whole.

/// Crisis-indicator substrings, matched case-insensitively anywhere in the
/// message text.
const CRISIS_INDICATORS: &[&str] = &["suicide", "self harm", "kill myself", "end my life"];

/// The fixed crisis response. Never altered or personalized per user.
const CRISIS_RESPONSE: &str = "I'm concerned about what you're sharing. \
    Please reach out to a professional or a crisis helpline immediately.";

/// Crisis-indicator filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyFilter;

impl SafetyFilter {
    pub fn new() -> Self {
        Self
    }

    /// Return the fixed crisis response if any indicator occurs in the text.
    ///
    /// Pure containment check: no I/O, no logging, cannot fail. `None` means
    /// "continue to the next stage".
    pub fn check(&self, text: &str) -> Option<&'static str> {
        let lowered = text.to_lowercase();
        if CRISIS_INDICATORS.iter().any(|ind| lowered.contains(ind)) {
            Some(CRISIS_RESPONSE)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_indicator() {
        let filter = SafetyFilter::new();
        for phrase in CRISIS_INDICATORS {
            assert!(
                filter.check(phrase).is_some(),
                "indicator '{phrase}' should trigger"
            );
        }
    }

    #[test]
    fn detects_indicator_case_insensitively() {
        let filter = SafetyFilter::new();
        assert!(filter.check("I want to KILL MYSELF").is_some());
        assert!(filter.check("Suicide has crossed my mind").is_some());
    }

    #[test]
    fn detects_indicator_anywhere_in_text() {
        let filter = SafetyFilter::new();
        let reply = filter.check("lately I've been thinking about self harm a lot");
        assert_eq!(reply, Some(CRISIS_RESPONSE));
    }

    #[test]
    fn response_is_always_the_fixed_string() {
        let filter = SafetyFilter::new();
        let a = filter.check("suicide").unwrap();
        let b = filter.check("I might end my life").unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn clean_text_passes_through() {
        let filter = SafetyFilter::new();
        assert!(filter.check("I am anxious about my exam").is_none());
        assert!(filter.check("hello").is_none());
    }

    #[test]
    fn empty_text_passes_through() {
        let filter = SafetyFilter::new();
        assert!(filter.check("").is_none());
    }
}
