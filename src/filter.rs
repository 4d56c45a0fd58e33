use std::collections::BTreeSet;

use crate::track::Track;

/// Allowed class labels; a read-only view over frame records
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClassFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl ClassFilter {
    /// Filter keeping `classes`; no classes at all means no filtering.
    pub fn only<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = classes.into_iter().map(Into::into).collect();

        if set.is_empty() {
            ClassFilter::All
        } else {
            ClassFilter::Only(set)
        }
    }

    #[inline]
    pub fn allows(&self, class: &str) -> bool {
        match self {
            ClassFilter::All => true,
            ClassFilter::Only(set) => set.contains(class),
        }
    }

    #[inline]
    pub fn iter<'a>(&'a self, tracks: &'a [Track]) -> impl Iterator<Item = &'a Track> + 'a {
        tracks.iter().filter(move |t| self.allows(&t.class))
    }

    pub fn apply(&self, tracks: &[Track]) -> Vec<Track> {
        self.iter(tracks).cloned().collect()
    }
}
