//! The AI tag-suggestion collaborator boundary.
//!
//! Suggestion is a black box behind [`TagSuggester`]. A failing suggester
//! must never block note editing; callers surface the error and move on.

use crate::error::NoteError;

/// Minimum content length, in characters, before suggestions are requested.
pub const MIN_SUGGEST_CONTENT_LEN: usize = 20;

/// External tag-suggestion contract.
#[allow(async_fn_in_trait)]
pub trait TagSuggester {
    /// Returns zero or more suggested tags for the given note content.
    async fn suggest_tags(&self, content: &str) -> Result<Vec<String>, NoteError>;
}

/// Checks that content is long enough to be worth suggesting tags for.
pub fn check_suggest_content(content: &str) -> Result<(), NoteError> {
    if content.trim().chars().count() < MIN_SUGGEST_CONTENT_LEN {
        return Err(NoteError::Validation(format!(
            "write at least {} characters to generate tags",
            MIN_SUGGEST_CONTENT_LEN
        )));
    }
    Ok(())
}

/// Merges suggested tags into an existing set, de-duplicated by
/// case-sensitive exact match, preserving insertion order.
pub fn merge_tags(existing: &[String], suggested: &[String]) -> Vec<String> {
    let mut merged = existing.to_vec();
    for tag in suggested {
        if !merged.iter().any(|t| t == tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSuggester(Vec<String>);

    impl TagSuggester for FixedSuggester {
        async fn suggest_tags(&self, _content: &str) -> Result<Vec<String>, NoteError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSuggester;

    impl TagSuggester for FailingSuggester {
        async fn suggest_tags(&self, _content: &str) -> Result<Vec<String>, NoteError> {
            Err(NoteError::Persistence("model unavailable".to_string()))
        }
    }

    #[test]
    fn test_content_length_gate() {
        assert!(check_suggest_content("too short").is_err());
        assert!(check_suggest_content("this content is long enough to tag").is_ok());
        // Whitespace padding does not count.
        assert!(check_suggest_content("   short   ").is_err());
    }

    #[test]
    fn test_merge_deduplicates_case_sensitively() {
        let existing = vec!["work".to_string(), "Ideas".to_string()];
        let suggested = vec![
            "work".to_string(),
            "ideas".to_string(),
            "todo".to_string(),
            "todo".to_string(),
        ];
        let merged = merge_tags(&existing, &suggested);
        // "work" is an exact duplicate; "ideas" differs in case and is kept.
        assert_eq!(
            merged,
            vec![
                "work".to_string(),
                "Ideas".to_string(),
                "ideas".to_string(),
                "todo".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_suggester_results_merge() {
        let suggester = FixedSuggester(vec!["rust".to_string(), "notes".to_string()]);
        let suggested = suggester.suggest_tags("some sufficiently long content").await.unwrap();
        let merged = merge_tags(&["notes".to_string()], &suggested);
        assert_eq!(merged, vec!["notes".to_string(), "rust".to_string()]);
    }

    #[tokio::test]
    async fn test_suggester_failure_is_recoverable() {
        let result = FailingSuggester.suggest_tags("anything").await;
        assert!(matches!(result, Err(NoteError::Persistence(_))));
    }
}
