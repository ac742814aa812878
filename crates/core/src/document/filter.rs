/// Case-insensitive substring filter over document names.
///
/// An empty or absent term matches every document. Any other term is used
/// as given, whitespace included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFilter {
    term: Option<String>,
}

impl NameFilter {
    pub fn new(term: Option<&str>) -> Self {
        NameFilter {
            term: term.filter(|t| !t.is_empty()).map(str::to_string),
        }
    }

    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.term {
            None => true,
            Some(term) => name.to_lowercase().contains(&term.to_lowercase()),
        }
    }

    /// `ILIKE` pattern with `\` as escape character.
    pub fn like_pattern(&self) -> String {
        let Some(term) = &self.term else {
            return "%".to_string();
        };
        let mut pattern = String::with_capacity(term.len() + 2);
        pattern.push('%');
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_term_matches_everything() {
        for filter in [NameFilter::new(None), NameFilter::new(Some(""))] {
            assert!(filter.matches("anything.bin"));
            assert_eq!(filter.like_pattern(), "%");
            assert_eq!(filter.term(), None);
        }
    }

    #[test]
    fn substring_match_ignores_case() {
        let filter = NameFilter::new(Some("RePort"));
        assert!(filter.matches("q1-report.pdf"));
        assert!(filter.matches("REPORT"));
        assert!(!filter.matches("summary.pdf"));
    }

    #[test]
    fn whitespace_is_part_of_the_term() {
        let filter = NameFilter::new(Some(" "));
        assert_eq!(filter.term(), Some(" "));
        assert!(filter.matches("my report.pdf"));
        assert!(!filter.matches("summary.pdf"));
        assert_eq!(filter.like_pattern(), "% %");

        let filter = NameFilter::new(Some(" report"));
        assert!(filter.matches("my report.pdf"));
        assert!(!filter.matches("report.pdf"));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(NameFilter::new(Some("a")).like_pattern(), "%a%");
        assert_eq!(NameFilter::new(Some("50%_off")).like_pattern(), "%50\\%\\_off%");
        assert_eq!(NameFilter::new(Some("c:\\x")).like_pattern(), "%c:\\\\x%");
    }
}
