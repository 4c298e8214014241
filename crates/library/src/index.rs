use std::collections::BTreeMap;

use common::{normalize_name, Articles, Artist, ArtistIndex, ArtistInfo, IndexGroups};

use crate::{LibraryError, Repository};

/// Artist index accumulated over a single scan.
///
/// Entries are keyed by group label, then by normalized artist name. A later artist
/// with the same normalized name replaces the earlier one.
pub struct IndexBuilder {
    groups: IndexGroups,
    articles: Articles,
    entries: BTreeMap<String, BTreeMap<String, ArtistInfo>>,
}

impl IndexBuilder {
    pub fn new(groups: IndexGroups, articles: Articles) -> Self {
        Self {
            groups,
            articles,
            entries: BTreeMap::new(),
        }
    }

    /// Files the artist under its group. Returns false when the normalized name is
    /// empty and the artist is left out of the index.
    pub fn collect(&mut self, artist: &Artist) -> bool {
        let name = normalize_name(&artist.name, &self.articles);
        if name.is_empty() {
            return false;
        }
        let group = self.groups.group_for(&name).to_string();
        self.entries.entry(group).or_default().insert(
            name,
            ArtistInfo {
                artist_id: artist.id.clone(),
                artist: artist.name.clone(),
            },
        );
        true
    }

    pub fn group_count(&self) -> usize {
        self.entries.len()
    }

    pub fn artist_count(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// The index records as they would be written: groups by label, members by
    /// normalized name.
    pub fn build(&self) -> Vec<ArtistIndex> {
        self.entries
            .iter()
            .filter(|(_, members)| !members.is_empty())
            .map(|(group, members)| ArtistIndex {
                id: group.clone(),
                artists: members.values().cloned().collect(),
            })
            .collect()
    }

    /// Writes one record per non-empty group and stops at the first failed write.
    pub fn flush(self, repo: &dyn Repository<Entity = ArtistIndex>) -> Result<usize, LibraryError> {
        let mut written = 0usize;
        for mut index in self.build() {
            repo.put(&mut index)?;
            written += 1;
        }
        Ok(written)
    }
}
