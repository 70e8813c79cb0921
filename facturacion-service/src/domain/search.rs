//! Autocomplete search terms.

/// Shortest trimmed text that triggers a catalog search.
pub const MIN_SEARCH_LEN: usize = 2;

/// Most rows an autocomplete search returns.
pub const SEARCH_LIMIT: i64 = 10;

/// Normalized catalog search input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    /// Trimmed text matched as a case-insensitive substring.
    pub text: String,
    /// Numeric reading of the text for id matches. Non-numeric text maps to 0,
    /// which no storage-assigned id takes.
    pub id: i64,
}

impl SearchTerm {
    /// `None` when the trimmed text is too short to search.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim();
        if text.chars().count() < MIN_SEARCH_LEN {
            return None;
        }

        Some(Self {
            text: text.to_string(),
            id: text.parse().unwrap_or(0),
        })
    }

    /// SQL `ILIKE` pattern with wildcards in the text escaped.
    pub fn like_pattern(&self) -> String {
        let escaped = self
            .text
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    }

    /// Case-insensitive substring match used by the in-memory store.
    pub fn matches_text(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.text.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_or_blank_text_is_not_searchable() {
        assert_eq!(SearchTerm::parse(""), None);
        assert_eq!(SearchTerm::parse("a"), None);
        assert_eq!(SearchTerm::parse("   b   "), None);
        assert_eq!(SearchTerm::parse("\t\n"), None);
    }

    #[test]
    fn text_is_trimmed_and_read_as_id() {
        let term = SearchTerm::parse("  42 ").unwrap();
        assert_eq!(term.text, "42");
        assert_eq!(term.id, 42);
    }

    #[test]
    fn non_numeric_text_uses_zero_id() {
        let term = SearchTerm::parse("arroz").unwrap();
        assert_eq!(term.id, 0);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let term = SearchTerm::parse("50%_off").unwrap();
        assert_eq!(term.like_pattern(), "%50\\%\\_off%");
    }

    #[test]
    fn text_match_ignores_case() {
        let term = SearchTerm::parse("TIENDA").unwrap();
        assert!(term.matches_text("Mi tienda de barrio"));
        assert!(!term.matches_text("Almacén"));
    }
}
