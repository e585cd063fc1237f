/// Re-checks the fragments returned by the search API against the literal
/// query term, since the API matches under its own (broader) rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchFilter {
    pub ignore_case: bool,
    pub accept_all: bool,
}

impl MatchFilter {
    pub fn new(ignore_case: bool, accept_all: bool) -> Self {
        MatchFilter {
            ignore_case,
            accept_all,
        }
    }

    /// Returns true if `fragment` should be kept for `term`.
    pub fn accept(&self, fragment: &str, term: &str) -> bool {
        if self.accept_all {
            return true;
        }

        if self.ignore_case {
            fragment.to_lowercase().contains(&term.to_lowercase())
        } else {
            fragment.contains(term)
        }
    }
}
