use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::aggregator::{RawMatch, ResultAggregator};
use crate::error::{Result, SearchError};
use crate::filter::MatchFilter;
use crate::ordered::OrderedResultSet;
use crate::query::{PageCursor, SearchQuery};
use crate::rate_limit::{self, Quota};
use crate::Args;

pub const DEFAULT_API_BASE: &str = "https://api.github.com/";

const USER_AGENT: &str = concat!("gitsearch/", env!("CARGO_PKG_VERSION"));

/// One page of code search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub items: Vec<RawMatch>,
    pub total_count: u64,
    pub next_page: Option<u32>,
}

/// An organization on the server, as listed by `--orgs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub id: u64,
    pub login: String,
}

/// Resolves the API root from a `--server` value.
///
/// Empty means public GitHub. Enterprise servers get `api/v3/` appended
/// unless the URL already points there or the host is itself an API host
/// (`api.` prefix or `.api.` inside, as on GHE.com).
pub fn api_base(server: Option<&str>) -> Result<String> {
    let server = match server.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(DEFAULT_API_BASE.to_string()),
    };

    let mut base =
        url::Url::parse(server).map_err(|_| SearchError::InvalidServer(server.to_string()))?;
    let host = base.host_str().unwrap_or("").to_string();

    let mut path = base.path().to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    if !path.ends_with("/api/v3/") && !host.starts_with("api.") && !host.contains(".api.") {
        path.push_str("api/v3/");
    }
    base.set_path(&path);

    Ok(base.to_string())
}

pub struct GitHubSearcher {
    client: Client,
    token: String,
    api_base: String,
    trace_http: bool,
    progress: ProgressBar,
}

impl GitHubSearcher {
    /// Create a new GitHubSearcher instance
    pub fn new(args: &Args) -> Result<Self> {
        // clap fills the token from GITHUB_TOKEN (and .env) when --token is absent
        let token = match &args.token {
            Some(t) if !t.trim().is_empty() => t.clone(),
            _ => {
                error!("GitHub token not provided or found in environment");
                return Err(SearchError::MissingToken);
            }
        };

        let api_base = api_base(args.server.as_deref())?;

        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        progress.enable_steady_tick(Duration::from_millis(80));

        let mut searcher = GitHubSearcher::with_base_url(&api_base, &token)?;
        searcher.trace_http = args.debug;
        searcher.progress = progress;
        Ok(searcher)
    }

    /// Searcher against an explicit API root, with no progress display.
    pub fn with_base_url(api_base: &str, token: &str) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        let mut api_base = api_base.to_string();
        if !api_base.ends_with('/') {
            api_base.push('/');
        }

        Ok(GitHubSearcher {
            client,
            token: token.to_string(),
            api_base,
            trace_http: false,
            progress: ProgressBar::hidden(),
        })
    }

    fn get(&self, endpoint: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.api_base, endpoint))
            .header("Accept", "application/vnd.github.text-match+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Sends the request built by `build`, re-sending it after every rate-limit
    /// response until the server answers with something else.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        loop {
            let request = build().build()?;
            if self.trace_http {
                trace!("--> {} {}", request.method(), request.url());
            }

            let response = self.client.execute(request).await?;
            let status = response.status();
            if self.trace_http {
                trace!("<-- {} {:?}", status, response.headers());
            }

            if status.is_success() {
                return Ok(response);
            }

            let now = Utc::now().timestamp();
            if let Some(wait) = rate_limit::retry_after(status, response.headers(), now) {
                warn!("Rate limited ({}). Retrying in {} seconds", status, wait.as_secs());
                self.wait_out(wait).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Err(SearchError::Api { status, message });
        }
    }

    /// Sleeps through a rate-limit window with a countdown on the spinner.
    async fn wait_out(&self, wait: Duration) {
        if wait.is_zero() {
            return;
        }

        let original_msg = self.progress.message();
        let start = Instant::now();
        let end = start + wait;

        while Instant::now() < end {
            let remaining = end - Instant::now();
            self.progress
                .set_message(format!("Rate limited - waiting {}s", remaining.as_secs() + 1));
            tokio::time::sleep(remaining.min(Duration::from_millis(500))).await;
        }

        self.progress.set_message(original_msg);
    }

    /// Fetch one page of results. Rate limits are waited out and the same page
    /// is requested again; every other failure is returned.
    pub async fn fetch_page(&self, query: &SearchQuery, cursor: &PageCursor) -> Result<SearchPage> {
        let q = query.composed();
        let page = cursor.page().to_string();
        let per_page = cursor.per_page().to_string();

        let response = self
            .send_with_retry(|| {
                self.get("search/code").query(&[
                    ("q", q.as_str()),
                    ("page", page.as_str()),
                    ("per_page", per_page.as_str()),
                    ("sort", "indexed"),
                    ("order", "desc"),
                ])
            })
            .await?;

        let next_page = rate_limit::next_page(response.headers(), response.url());
        let quota = Quota::from_headers(response.headers());

        let json: Value = response.json().await?;
        let items = json
            .get("items")
            .and_then(|v| v.as_array())
            .ok_or_else(|| SearchError::Decode("no 'items' array in search response".into()))?;
        let total_count = json.get("total_count").and_then(|v| v.as_u64()).unwrap_or(0);

        let items: Vec<RawMatch> = items.iter().map(raw_match).collect();

        debug!(
            "Page {}: {} results (total {}), next page {:?}",
            cursor.page(),
            items.len(),
            total_count,
            next_page
        );
        if let Some(quota) = quota {
            debug!("Rate limit remaining: {}", quota);
        }

        Ok(SearchPage {
            items,
            total_count,
            next_page,
        })
    }

    /// Run the search to completion and return the sorted results.
    ///
    /// Pages are fetched one after another until the server stops reporting a
    /// next page. Any fatal error aborts the whole search with no results.
    pub async fn search(
        &self,
        query: &SearchQuery,
        filter: MatchFilter,
        highlight: bool,
    ) -> Result<OrderedResultSet> {
        let mut cursor = PageCursor::first();
        let mut aggregator = ResultAggregator::new(query.term(), filter, highlight);

        info!("Searching for {}", query.composed());

        loop {
            self.progress
                .set_message(format!("Searching '{}' - page {}", query.term(), cursor.page()));

            let page = match self.fetch_page(query, &cursor).await {
                Ok(page) => page,
                Err(e) => {
                    error!("Error searching page {}: {}", cursor.page(), e);
                    self.progress.finish_and_clear();
                    return Err(e);
                }
            };

            for item in page.items {
                aggregator.fold(item);
            }

            match page.next_page {
                Some(next) if cursor.advance_to(next) => {}
                Some(next) => {
                    warn!(
                        "Next page {} does not follow page {}, stopping",
                        next,
                        cursor.page()
                    );
                    break;
                }
                None => {
                    debug!("No more results after page {}", cursor.page());
                    break;
                }
            }
        }

        self.progress.finish_and_clear();

        let results = aggregator.finish(&query.composed());
        info!("Found matches in {} repositories", results.len());
        Ok(results)
    }

    /// List every organization on the server, paging by last seen id.
    pub async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let mut orgs = Vec::new();
        let mut since: u64 = 0;

        loop {
            self.progress
                .set_message(format!("Listing organizations since {}", since));

            let since_param = since.to_string();
            let response = self
                .send_with_retry(|| {
                    self.get("organizations")
                        .query(&[("since", since_param.as_str()), ("per_page", "100")])
                })
                .await?;

            let json: Value = response.json().await?;
            let page = json
                .as_array()
                .ok_or_else(|| SearchError::Decode("organization list is not an array".into()))?;

            debug!("Organizations since {}: {}", since, page.len());
            if page.is_empty() {
                break;
            }

            for org in page {
                let id = org.get("id").and_then(|v| v.as_u64()).unwrap_or(0);
                let login = org.get("login").and_then(|v| v.as_str()).unwrap_or("");
                orgs.push(Organization {
                    id,
                    login: login.to_string(),
                });
                since = since.max(id);
            }

            if since_param == since.to_string() {
                warn!("Organization ids did not advance past {}, stopping", since);
                break;
            }
        }

        self.progress.finish_and_clear();
        Ok(orgs)
    }
}

fn raw_match(item: &Value) -> RawMatch {
    let str_at = |v: Option<&Value>| v.and_then(|v| v.as_str()).unwrap_or("").to_string();
    let repo = item.get("repository");

    let fragments = item
        .get("text_matches")
        .and_then(|v| v.as_array())
        .map(|matches| {
            matches
                .iter()
                .filter_map(|m| m.get("fragment").and_then(|f| f.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    RawMatch {
        repo_name: str_at(repo.and_then(|r| r.get("full_name"))),
        repo_url: str_at(repo.and_then(|r| r.get("html_url"))),
        path: str_at(item.get("path")),
        file_url: str_at(item.get("html_url")),
        fragments,
    }
}
