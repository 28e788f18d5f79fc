use common::models::{normalize_label, AlgorithmEntry};

/// Resolves provider algorithm labels to configured algorithm entries.
///
/// Labels and synonyms are compared after normalization. Synonym sets are
/// expected to be disjoint; if they overlap the first entry in profile order
/// wins.
pub struct AlgorithmMatcher<'a> {
    entries: &'a [AlgorithmEntry],
    labels: Vec<Vec<String>>,
}

impl<'a> AlgorithmMatcher<'a> {
    pub fn new(entries: &'a [AlgorithmEntry]) -> Self {
        let labels = entries
            .iter()
            .map(|entry| {
                std::iter::once(&entry.name)
                    .chain(entry.synonyms.iter())
                    .map(|label| normalize_label(label))
                    .collect::<Vec<String>>()
            })
            .collect();

        Self { entries, labels }
    }

    /// Entry whose name or synonyms contain the label
    pub fn resolve(&self, raw_label: &str) -> Option<&'a AlgorithmEntry> {
        let label = normalize_label(raw_label);
        let entries = self.entries;

        self.labels
            .iter()
            .position(|labels| labels.iter().any(|l| *l == label))
            .map(|index| &entries[index])
    }

    /// Canonical name for the label, normalized
    pub fn resolve_name(&self, raw_label: &str) -> Option<String> {
        self.resolve(raw_label).map(|entry| normalize_label(&entry.name))
    }

    /// Canonical name when configured, otherwise the normalized label itself
    pub fn canonicalize(&self, raw_label: &str) -> String {
        self.resolve_name(raw_label)
            .unwrap_or_else(|| normalize_label(raw_label))
    }
}
