/// Largest page size the search endpoint accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// The search term and optional qualifiers, fixed before the first request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    term: String,
    filter: Option<String>,
}

impl SearchQuery {
    /// Joins `words` with spaces. An empty or blank filter is ignored.
    pub fn new<S: AsRef<str>>(words: &[S], filter: Option<&str>) -> Self {
        let term = words
            .iter()
            .map(|w| w.as_ref())
            .collect::<Vec<_>>()
            .join(" ");

        let filter = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        SearchQuery { term, filter }
    }

    /// The term as typed, used for fragment filtering and highlight anchors.
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// The term, wrapped in quotes when it spans several words so the API
    /// searches for the phrase.
    pub fn quoted_term(&self) -> String {
        if self.term.contains(' ') {
            format!("\"{}\"", self.term)
        } else {
            self.term.clone()
        }
    }

    /// The full `q` parameter sent to the endpoint.
    pub fn composed(&self) -> String {
        match &self.filter {
            Some(filter) => format!("{} {}", self.quoted_term(), filter),
            None => self.quoted_term(),
        }
    }
}

/// Page position in the result sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: u32,
    per_page: u32,
}

impl PageCursor {
    pub fn first() -> Self {
        PageCursor {
            page: 1,
            per_page: MAX_PER_PAGE,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Moves to `next`. Returns false, leaving the cursor untouched, if `next`
    /// would not move forward.
    pub fn advance_to(&mut self, next: u32) -> bool {
        if next <= self.page {
            return false;
        }
        self.page = next;
        true
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::first()
    }
}
