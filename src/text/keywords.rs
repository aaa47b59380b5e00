use serde::{Deserialize, Serialize};

/// Case-insensitive keyword set used as the admission filter.
///
/// Keywords are case-folded once at construction; the set is immutable
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    /// Build a set from comma-separated user input, e.g. `"OpenAI, GPT"`.
    pub fn parse_list(input: &str) -> Self {
        Self::new(input.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    /// True iff any keyword occurs in `text`, ignoring case.
    pub fn matches(&self, text: &str) -> bool {
        matches(text, self)
    }
}

impl From<Vec<String>> for KeywordSet {
    fn from(keywords: Vec<String>) -> Self {
        Self::new(keywords)
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(set: KeywordSet) -> Self {
        set.keywords
    }
}

/// Case-insensitive substring test. An empty set never matches.
pub fn matches(text: &str, keywords: &KeywordSet) -> bool {
    if keywords.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    keywords.iter().any(|k| text.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_ignores_case() {
        let set = KeywordSet::new(["GPT"]);
        assert!(set.matches("I asked chatgpt about it"));
        assert!(set.matches("GPT-4 release"));
        assert!(!set.matches("nothing relevant here"));
    }

    #[test]
    fn test_empty_set_never_matches() {
        let set = KeywordSet::default();
        assert!(!set.matches(""));
        assert!(!set.matches("anything at all"));
    }

    #[test]
    fn test_any_keyword_is_enough() {
        let set = KeywordSet::new(["OpenAI", "Learning"]);
        assert!(set.matches("machine learning thread"));
        assert!(set.matches("openai news"));
        assert!(!set.matches("gpt only"));
    }

    #[test]
    fn test_parse_list_drops_blanks() {
        let set = KeywordSet::parse_list("OpenAI, ,GPT ,");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["openai", "gpt"]);
    }

    #[test]
    fn test_blank_keywords_do_not_match_everything() {
        let set = KeywordSet::new(["", "   "]);
        assert!(set.is_empty());
        assert!(!set.matches("some text"));
    }

    #[test]
    fn test_non_ascii_case_folding() {
        let set = KeywordSet::new(["ÉCOLE"]);
        assert!(set.matches("une école publique"));
    }

    #[test]
    fn test_deserializes_from_list() {
        let set: KeywordSet = serde_json::from_str(r#"["GPT", "AI"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.matches("ai"));
    }
}
