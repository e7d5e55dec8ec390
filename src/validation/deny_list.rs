use super::ValidationError;

const DEFAULT_TERMS: &[&str] = &[
    "fuck", "shit", "bitch", "cunt", "asshole", "bastard", "dickhead", "slut", "whore", "wanker",
];

/// Terms rejected in free-text fields. Matching is a case-insensitive
/// substring search, so "FUCKING" matches "fuck".
#[derive(Debug, Clone)]
pub struct DenyList {
    terms: Vec<String>,
}

impl Default for DenyList {
    fn default() -> Self {
        Self::new(DEFAULT_TERMS.iter().copied())
    }
}

impl DenyList {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self { terms: Vec::new() };
        list.extend(terms);
        list
    }

    pub fn extend<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for term in terms {
            let term = term.as_ref().trim().to_lowercase();
            if !term.is_empty() && !self.terms.contains(&term) {
                self.terms.push(term);
            }
        }
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn find(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.terms
            .iter()
            .find(|term| haystack.contains(term.as_str()))
            .map(String::as_str)
    }

    pub fn screen(&self, field: &str, text: &str) -> Result<(), ValidationError> {
        match self.find(text) {
            Some(_) => Err(ValidationError::new(format!(
                "{field} contains disallowed language"
            ))),
            None => Ok(()),
        }
    }
}
