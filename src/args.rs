use clap::{Parser, ValueEnum};

/// Output format for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Html,
    Json,
}

/// Search code on GitHub and print the text matches grouped by repository and file.
#[derive(Debug, Parser)]
#[clap(
    author,
    version,
    about,
    long_about = "Search code on GitHub (or a GitHub Enterprise server), follow every result page while waiting out rate limits, and print the matching fragments grouped by repository and file."
)]
pub struct Args {
    /// Words to search for. Several words are searched as one phrase.
    #[clap(value_name = "WORDS", required_unless_present = "orgs")]
    pub words: Vec<String>,

    /// Enterprise server URL. Uses https://api.github.com/ if empty.
    #[clap(long, env = "GITHUB_BASE_URL")]
    pub server: Option<String>,

    /// GitHub API token for authentication.
    #[clap(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Search qualifiers appended to the query, e.g. "language:go org:acme".
    #[clap(long)]
    pub filter: Option<String>,

    /// Keep every fragment the API returns, even without a literal match.
    #[clap(long)]
    pub all: bool,

    /// Add a text-fragment anchor to file links so browsers highlight the match.
    #[clap(long)]
    pub highlight: bool,

    /// Match fragments case-insensitively.
    #[clap(short = 'i', long)]
    pub ignore_case: bool,

    /// Log every HTTP request and response.
    #[clap(long)]
    pub debug: bool,

    /// Log page and rate-limit progress.
    #[clap(short, long)]
    pub verbose: bool,

    /// Output format.
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// With --format html, open the results in a browser instead of printing them.
    #[clap(long)]
    pub browse: bool,

    /// List all organizations instead of searching.
    #[clap(long)]
    pub orgs: bool,
}
