use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::filter::MatchFilter;
use crate::ordered::OrderedResultSet;

/// One code search hit as returned by the API, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    pub repo_name: String,
    pub repo_url: String,
    pub path: String,
    pub file_url: String,
    pub fragments: Vec<String>,
}

/// A file with the fragments that survived filtering, in API order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: String,
    pub href: String,
    pub matches: Vec<String>,
}

/// A repository and its matching files, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoRecord {
    pub name: String,
    pub href: String,
    pub files: Vec<FileRecord>,
}

impl RepoRecord {
    fn new(name: &str, href: &str) -> Self {
        RepoRecord {
            name: name.to_string(),
            href: href.to_string(),
            files: Vec::new(),
        }
    }
}

/// Builds the `#:~:text=` suffix browsers use to scroll to matched text.
///
/// `-` is escaped too: a bare dash at either end of the text reads as
/// prefix/suffix syntax.
pub fn highlight_anchor(term: &str) -> String {
    format!("#:~:text={}", urlencoding::encode(term).replace('-', "%2D"))
}

/// Accumulates search hits across pages, keyed by repository full name.
#[derive(Debug)]
pub struct ResultAggregator {
    term: String,
    filter: MatchFilter,
    anchor: Option<String>,
    repos: HashMap<String, RepoRecord>,
}

impl ResultAggregator {
    /// `term` is the unquoted search term fragments are checked against.
    pub fn new(term: &str, filter: MatchFilter, highlight: bool) -> Self {
        ResultAggregator {
            term: term.to_string(),
            filter,
            anchor: highlight.then(|| highlight_anchor(term)),
            repos: HashMap::new(),
        }
    }

    pub fn fold(&mut self, raw: RawMatch) {
        let repo = self
            .repos
            .entry(raw.repo_name.clone())
            .or_insert_with(|| RepoRecord::new(&raw.repo_name, &raw.repo_url));

        let mut href = raw.file_url;
        if let Some(anchor) = &self.anchor {
            href.push_str(anchor);
        }

        let matches: Vec<String> = raw
            .fragments
            .into_iter()
            .filter(|fragment| self.filter.accept(fragment, &self.term))
            .collect();

        if matches.is_empty() {
            debug!("Dropping {} in {}: no accepted fragments", raw.path, repo.name);
            return;
        }

        repo.files.push(FileRecord {
            path: raw.path,
            href,
            matches,
        });
    }

    pub fn repo(&self, name: &str) -> Option<&RepoRecord> {
        self.repos.get(name)
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Removes repositories that never got a matching file.
    pub fn prune(&mut self) {
        let before = self.repos.len();
        self.repos.retain(|_, repo| !repo.files.is_empty());

        let removed = before - self.repos.len();
        if removed > 0 {
            debug!("Pruned {} repositories without matches", removed);
        }
    }

    /// Prunes and freezes the aggregation into its sorted, read-only form.
    pub fn finish(mut self, query: &str) -> OrderedResultSet {
        self.prune();
        OrderedResultSet::from_map(query, self.repos)
    }
}
