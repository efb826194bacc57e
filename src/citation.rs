use std::collections::HashMap;

use crate::transcript::Source;

/// Per-turn lookup from source identifier to citation ordinal.
///
/// Ordinals are 1-based and follow the order sources were attached, so the
/// first source renders as `[1]`. Both the primary id and the storage-layer
/// secondary id resolve to the same ordinal; when ids collide, the earliest
/// source wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitationIndex {
    ordinals: HashMap<String, usize>,
    len: usize,
}

impl CitationIndex {
    #[must_use]
    pub fn from_sources(sources: &[Source]) -> Self {
        let mut ordinals = HashMap::new();
        for (position, source) in sources.iter().enumerate() {
            let ordinal = position + 1;
            if !source.id.is_empty() {
                ordinals.entry(source.id.clone()).or_insert(ordinal);
            }
            if let Some(secondary) = source.secondary_id.as_deref() {
                if !secondary.is_empty() {
                    ordinals.entry(secondary.to_owned()).or_insert(ordinal);
                }
            }
        }
        Self {
            ordinals,
            len: sources.len(),
        }
    }

    /// 1-based ordinal for a cited identifier, or `None` when no attached
    /// source matches.
    #[must_use]
    pub fn ordinal(&self, id: &str) -> Option<usize> {
        self.ordinals.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::CitationIndex;
    use crate::transcript::Source;

    fn source(id: &str, secondary: Option<&str>) -> Source {
        Source {
            secondary_id: secondary.map(str::to_owned),
            ..Source::new(id)
        }
    }

    #[test]
    fn ordinals_follow_attachment_order() {
        let index = CitationIndex::from_sources(&[
            source("alpha", None),
            source("beta", None),
            source("gamma", None),
        ]);

        assert_eq!(index.ordinal("alpha"), Some(1));
        assert_eq!(index.ordinal("beta"), Some(2));
        assert_eq!(index.ordinal("gamma"), Some(3));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn secondary_id_resolves_to_same_ordinal() {
        let index = CitationIndex::from_sources(&[source("doc-1", Some("65f0a"))]);

        assert_eq!(index.ordinal("doc-1"), Some(1));
        assert_eq!(index.ordinal("65f0a"), Some(1));
    }

    #[test]
    fn unknown_id_returns_none() {
        let index = CitationIndex::from_sources(&[source("known", None)]);

        assert_eq!(index.ordinal("unknown"), None);
        assert_eq!(index.ordinal(""), None);
    }

    #[test]
    fn duplicate_ids_keep_the_earliest_source() {
        let index = CitationIndex::from_sources(&[
            source("dup", None),
            source("dup", Some("other")),
        ]);

        assert_eq!(index.ordinal("dup"), Some(1));
        assert_eq!(index.ordinal("other"), Some(2));
        assert_eq!(index.len(), 2);
    }
}
