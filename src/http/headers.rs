/// Ordered header map.
///
/// Names are stored exactly as received. Inserting a name that is already
/// present replaces its value in place, so the original position is kept
/// (last write wins). Lookups through [`Headers::get`] are case-sensitive;
/// [`Headers::get_ignore_case`] exists for the framing headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
    last: Option<usize>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a header value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.entries.iter().position(|(k, _)| *k == name) {
            Some(idx) => {
                self.entries[idx].1 = value;
                self.last = Some(idx);
            }
            None => {
                self.entries.push((name, value));
                self.last = Some(self.entries.len() - 1);
            }
        }
    }

    /// Appends a continuation fragment to the most recently stored header.
    ///
    /// Returns `false` when no header has been stored yet.
    pub fn append_to_last(&mut self, fragment: &str) -> bool {
        match self.last {
            Some(idx) => {
                self.entries[idx].1.push_str(fragment);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive lookup. When several names differ only by case, the
    /// last one in wire order is returned.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values whose name matches `name` ignoring ASCII case.
    pub fn get_all_ignore_case<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == name)?;
        self.last = None;
        Some(self.entries.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
