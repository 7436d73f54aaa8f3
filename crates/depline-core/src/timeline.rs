//! Sparse per-version change markers

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Position of a version inside its project's sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct VersionIdx(pub u32);

impl VersionIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Positional predecessor.
    pub fn previous(self) -> Option<VersionIdx> {
        self.0.checked_sub(1).map(VersionIdx)
    }

    pub fn next(self) -> VersionIdx {
        VersionIdx(self.0 + 1)
    }
}

/// A sparse map from version to marker. A missing entry means "no recorded change here".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline<T> {
    markers: BTreeMap<VersionIdx, T>,
}

impl<T> Timeline<T> {
    pub fn new() -> Self {
        Timeline { markers: BTreeMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Marker recorded exactly at `at`.
    pub fn get(&self, at: VersionIdx) -> Option<&T> {
        self.markers.get(&at)
    }

    pub fn insert(&mut self, at: VersionIdx, value: T) -> Option<T> {
        self.markers.insert(at, value)
    }

    pub fn remove(&mut self, at: VersionIdx) -> Option<T> {
        self.markers.remove(&at)
    }

    /// Most recent marker at or before `until`.
    pub fn latest_at_or_before(&self, until: VersionIdx) -> Option<(VersionIdx, &T)> {
        self.markers.range(..=until).next_back().map(|(at, value)| (*at, value))
    }

    /// Most recent marker inside `[from..=until]`. Callers validate the range.
    pub fn latest_between(&self, from: VersionIdx, until: VersionIdx) -> Option<(VersionIdx, &T)> {
        self.markers.range(from..=until).next_back().map(|(at, value)| (*at, value))
    }

    /// First marker strictly after `at`.
    pub fn next_after(&self, at: VersionIdx) -> Option<(VersionIdx, &T)> {
        self.markers.range(at.next()..).next().map(|(at, value)| (*at, value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (VersionIdx, &T)> {
        self.markers.iter().map(|(at, value)| (*at, value))
    }
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Stored as a list of pairs so JSON keeps integer positions.
impl<T: Serialize> Serialize for Timeline<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.markers.iter())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Timeline<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = Vec::<(VersionIdx, T)>::deserialize(deserializer)?;
        Ok(Timeline {
            markers: pairs.into_iter().collect(),
        })
    }
}
