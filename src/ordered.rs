use std::collections::HashMap;

use serde::Serialize;

use crate::aggregator::RepoRecord;

/// Final search results, sorted by repository name.
///
/// Built once from the aggregation map after the last page; it only hands
/// out shared references, so renderers always see the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedResultSet {
    query: String,
    repos: Vec<RepoRecord>,
}

impl OrderedResultSet {
    pub fn from_map(query: &str, map: HashMap<String, RepoRecord>) -> Self {
        let mut entries: Vec<(String, RepoRecord)> = map.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        OrderedResultSet {
            query: query.to_string(),
            repos: entries.into_iter().map(|(_, repo)| repo).collect(),
        }
    }

    /// The composed query string that produced these results.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn repos(&self) -> &[RepoRecord] {
        &self.repos
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RepoRecord> {
        self.repos.iter()
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

impl<'a> IntoIterator for &'a OrderedResultSet {
    type Item = &'a RepoRecord;
    type IntoIter = std::slice::Iter<'a, RepoRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
