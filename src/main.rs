use clap::Parser;
use dotenv::dotenv;
use std::io::{self, BufWriter, Write};
use std::process;
use tracing::Level;

use gitsearch_lib::{render, Args, GitHubSearcher, MatchFilter, OutputFormat, SearchQuery};

async fn run(args: Args) -> gitsearch_lib::Result<()> {
    let searcher = GitHubSearcher::new(&args)?;

    if args.orgs {
        let orgs = searcher.list_organizations().await?;
        let mut out = BufWriter::new(io::stdout().lock());
        for org in orgs {
            writeln!(out, "{}", org.login)?;
        }
        out.flush()?;
        return Ok(());
    }

    let query = SearchQuery::new(&args.words, args.filter.as_deref());
    let filter = MatchFilter::new(args.ignore_case, args.all);
    let results = searcher.search(&query, filter, args.highlight).await?;

    if args.format == OutputFormat::Html && args.browse {
        return render::browse(&results);
    }

    let mut out = BufWriter::new(io::stdout().lock());
    render::render(&results, args.format, &mut out)?;
    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so rendered results on stdout stay clean.
    let level = if args.debug {
        Level::TRACE
    } else if args.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
