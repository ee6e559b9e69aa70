//! Rule conditions - matching file names by type and identifier

/// Name-based filter of a rule. Pure: never touches the filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
    /// Lowercase extensions without the leading dot (e.g. "pdf", "tar.gz")
    file_types: Vec<String>,

    /// Lowercase substrings, any of which must occur in the name
    identifiers: Vec<String>,
}

impl Condition {
    pub fn new<T, I>(file_types: T, identifiers: I) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            file_types: normalize(
                file_types
                    .into_iter()
                    .map(|t| t.as_ref().trim_start_matches('.').to_string()),
            ),
            identifiers: normalize(identifiers.into_iter().map(|i| i.as_ref().to_string())),
        }
    }

    pub fn file_types(&self) -> &[String] {
        &self.file_types
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Check if a file name matches both the type and identifier filters
    pub fn matches(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        self.type_matches(&name) && self.identifier_matches(&name)
    }

    fn type_matches(&self, name: &str) -> bool {
        if self.file_types.is_empty() {
            return true;
        }
        self.file_types.iter().any(|ext| {
            name.strip_suffix(ext.as_str())
                .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    fn identifier_matches(&self, name: &str) -> bool {
        if self.identifiers.is_empty() {
            return true;
        }
        self.identifiers.iter().any(|id| name.contains(id.as_str()))
    }
}

/// Lowercase, drop blanks and duplicates, keep first-seen order
fn normalize(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim().to_lowercase();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
