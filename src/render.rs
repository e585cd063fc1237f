//! Presentation of an [`OrderedResultSet`] as text, HTML or JSON.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::Write;

use crate::args::OutputFormat;
use crate::error::{Result, SearchError};
use crate::ordered::OrderedResultSet;

const HTML_STYLE: &str = r#"<style>
  body { margin: 8px; background-color: #f1f8ff; }
  h1, h2, h3, h4 { color: #333; margin-top: 10px; margin-bottom: 10px; }
  h1 { font-size: 1.5em; }
  h2 { font-size: 1.2em; margin-left: 20px; }
  h4 { margin-left: 20px; }
  a { text-decoration: none; color: inherit; }
  .results { margin-left: 20px; }
  .file { background-color: #e0e0e0; padding: 1px; margin-left: 30px; }
  pre { background-color: #d0f0ff; margin: 4px; }
</style>"#;

pub fn render<W: Write>(results: &OrderedResultSet, format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Text => render_text(results, out),
        OutputFormat::Html => render_html(results, out),
        OutputFormat::Json => render_json(results, out),
    }
}

pub fn render_text<W: Write>(results: &OrderedResultSet, out: &mut W) -> Result<()> {
    writeln!(out)?;
    write!(out, "query: {}", results.query())?;

    for repo in results {
        write!(out, "\n{}\n{}", "-".repeat(80), repo.name)?;
        for file in &repo.files {
            write!(out, "\n  {}", file.path)?;
            for (i, fragment) in file.matches.iter().enumerate() {
                if i > 0 {
                    write!(out, "\n      ...")?;
                }
                for line in fragment.split('\n') {
                    write!(out, "\n  |   {}", line)?;
                }
            }
        }
    }

    write!(out, "\n\n{}\nRepositories:", "=".repeat(80))?;
    for repo in results {
        write!(out, "\n  {}", repo.href)?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn render_html<W: Write>(results: &OrderedResultSet, out: &mut W) -> Result<()> {
    writeln!(out, "<html><head><title>Search results</title>")?;
    writeln!(out, r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#)?;
    writeln!(out, "{}</head><body>", HTML_STYLE)?;
    writeln!(
        out,
        "<h1>Query</h1><h2>{}</h2><h1>Results</h1>",
        escape_html(results.query())
    )?;
    writeln!(out, r#"<div class="results">"#)?;

    for repo in results {
        writeln!(out, r#"<div class="repo">"#)?;
        writeln!(
            out,
            r#"  <h3><a href="{}">{}</a></h3>"#,
            escape_html(&repo.href),
            escape_html(&repo.name)
        )?;
        for file in &repo.files {
            writeln!(
                out,
                r#"    <h4><a href="{}">{}</a></h4>"#,
                escape_html(&file.href),
                escape_html(&file.path)
            )?;
            writeln!(out, r#"    <div class="file">"#)?;
            for fragment in &file.matches {
                writeln!(out, "      <pre>{}</pre>", escape_html(fragment))?;
            }
            writeln!(out, "    </div>")?;
        }
        writeln!(out, "</div>")?;
    }

    writeln!(out, "<hr/>\n<h2>Repositories</h2>\n<pre>")?;
    for repo in results {
        writeln!(out, "  {}", escape_html(&repo.href))?;
    }
    writeln!(out, "</pre>\n</div></body></html>")?;
    Ok(())
}

pub fn render_json<W: Write>(results: &OrderedResultSet, out: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, results)
        .map_err(|e| SearchError::Render(e.into()))?;
    writeln!(out)?;
    Ok(())
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `data:` URL holding the HTML rendering, for handing to a browser.
pub fn html_data_url(results: &OrderedResultSet) -> Result<String> {
    let mut page = Vec::new();
    render_html(results, &mut page)?;
    Ok(format!("data:text/html;base64,{}", STANDARD.encode(page)))
}

/// Opens the HTML rendering in the default browser.
///
/// Some platforms need a handler registered for `data:` URLs.
pub fn browse(results: &OrderedResultSet) -> Result<()> {
    let url = html_data_url(results)?;
    webbrowser::open(&url).map_err(|e| SearchError::Browse(e.to_string()))
}
