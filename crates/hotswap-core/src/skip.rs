use std::path::Path;

/// File names the full applier never writes, compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipList {
    names: Vec<String>,
}

impl SkipList {
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for name in names {
            list.insert(name.as_ref());
        }
        list
    }

    pub fn insert(&mut self, name: &str) {
        let name = name.to_lowercase();
        if !name.is_empty() && !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .is_some_and(|name| self.names.contains(&name))
    }
}
