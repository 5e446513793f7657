use blogfind::config::Config;
use blogfind::dom::{Dom, NodeData, NodeId};
use blogfind::grouping::{collect_matches, group_by_path};
use blogfind::highlight::{HighlightOutcome, MARK_CLASS};
use blogfind::index::{build_index, documents_from_value, load_index, write_index};
use blogfind::page::Page;
use blogfind::preview::{Segment, HIGHLIGHT_CLASS};
use blogfind::results::{result_entries, RenderOptions, CONTEXT_CLASS, ITEM_CLASS, NO_RESULTS_CLASS, TITLE_CLASS};
use blogfind::viewport::RecordingViewport;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// blogfind - Client-side search and highlight tooling for static blogs
#[derive(Parser)]
#[command(name = "blogfind")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = ".blogfind.toml")]
    config: PathBuf,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build search-data.json from a directory of posts
    Build {
        /// Posts directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "search-data.json")]
        output: PathBuf,

        /// File extensions to index (comma-separated)
        #[arg(short, long, default_value = "md,markdown")]
        types: String,

        /// Glob patterns to exclude (can be repeated)
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// Search the index the way the search box does
    Query {
        /// Search text
        terms: Vec<String>,

        /// Search index (defaults to data_path from the config)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Maximum results to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Output the rendered results panel HTML
        #[arg(long, conflicts_with = "json")]
        html: bool,
    },

    /// Apply a highlight request to a rendered post
    Highlight {
        /// Rendered post HTML
        file: PathBuf,

        /// Page URL carrying ?highlight=..&matchNum=..
        #[arg(short, long)]
        url: String,

        /// Print the marked content HTML
        #[arg(long)]
        html: bool,
    },

    /// Interactive search mode
    Repl {
        /// Search index (defaults to data_path from the config)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct JsonResult<'a> {
    path: &'a str,
    title: String,
    url: String,
    ordinal: usize,
    total: usize,
    preview: String,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };
    let _ = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    let result = Config::load(&cli.config)
        .map_err(Box::<dyn std::error::Error>::from)
        .and_then(|config| match cli.command {
            Commands::Build { path, output, types, exclude } => {
                cmd_build(&path, &output, &types, &exclude, cli.quiet)
            }
            Commands::Query { terms, data, limit, json, html } => {
                let data = data.unwrap_or_else(|| config.data_path.clone());
                cmd_query(&terms.join(" "), &data, limit, json, html, &config)
            }
            Commands::Highlight { file, url, html } => cmd_highlight(&file, &url, html, &config),
            Commands::Repl { data } => {
                let data = data.unwrap_or_else(|| config.data_path.clone());
                cmd_repl(&data, &config)
            }
        });

    if let Err(e) = result {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_build(
    path: &Path,
    output: &Path,
    types: &str,
    exclude: &[String],
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    if !quiet {
        println!("{} {}", "Indexing".cyan().bold(), path.display());
    }

    let extensions: Vec<String> = types.split(',').map(|s| s.trim().to_string()).collect();
    let documents = build_index(path, &extensions, exclude)?;
    write_index(&documents, output)?;

    if !quiet {
        let bytes: usize = documents.iter().map(|d| d.content.len()).sum();
        println!(
            "{} {} posts ({} bytes of text) in {:.2?}",
            "Indexed".green().bold(),
            documents.len().to_string().cyan(),
            bytes,
            start.elapsed()
        );
        println!("  {} {}", "->".dimmed(), output.display());
    }

    Ok(())
}

fn cmd_query(
    raw_query: &str,
    data: &Path,
    limit: usize,
    json: bool,
    html: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let query = raw_query.trim().to_lowercase();
    if query.chars().count() < config.min_query_chars {
        return Err(format!(
            "Query must be at least {} characters.",
            config.min_query_chars
        )
        .into());
    }

    let value = load_index(data)?;

    if html {
        // Drive the real search box so the output matches the site.
        let mut page = Page::load(Dom::new(), "/", RecordingViewport::new(), config.clone());
        if !page.install_search(&value) {
            return Err("Search index is malformed.".into());
        }
        page.type_query(&query);
        page.run_until_idle();
        if let Some(container) = page.results_container() {
            println!("{}", page.dom.to_html(container));
        }
        return Ok(());
    }

    let documents = documents_from_value(&value)?;
    let grouped = group_by_path(collect_matches(&documents, &query));
    let opts = RenderOptions {
        context_chars: config.context_chars,
        posts_prefix: &config.posts_prefix,
    };
    let entries = result_entries(&grouped, &query, &opts);

    if json {
        let results: Vec<JsonResult> = entries
            .iter()
            .take(limit)
            .map(|e| JsonResult {
                path: e.path,
                title: e.title.clone(),
                url: e.url.clone(),
                ordinal: e.ordinal,
                total: e.total,
                preview: e.preview.to_html(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No results found.".yellow());
        return Ok(());
    }

    println!(
        "{} matches in {} posts for: {}\n",
        entries.len().to_string().green().bold(),
        grouped.group_count().to_string().green(),
        query.cyan()
    );

    for entry in entries.iter().take(limit) {
        println!("{}  {}", entry.title.cyan(), entry.url.dimmed());
        let mut line = String::from("  ");
        if entry.preview.leading_ellipsis {
            line.push_str(&"...".dimmed().to_string());
        }
        for segment in &entry.preview.segments {
            match segment {
                Segment::Plain(text) => line.push_str(&flatten(text)),
                Segment::Highlight(text) => line.push_str(&text.yellow().bold().to_string()),
            }
        }
        if entry.preview.trailing_ellipsis {
            line.push_str(&"...".dimmed().to_string());
        }
        println!("{line}\n");
    }

    if entries.len() > limit {
        println!("{}", format!("... {} more", entries.len() - limit).dimmed());
    }

    Ok(())
}

fn cmd_highlight(file: &Path, url: &str, html: bool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(file).map_err(|e| format!("{}: {e}", file.display()))?;
    let mut page = Page::load(Dom::parse(&source), url, RecordingViewport::new(), config.clone());
    page.advance(config.content_wait());

    match page.highlighter().outcome() {
        HighlightOutcome::NoRequest => {
            println!("{}", "No highlight parameter in URL.".yellow());
            return Ok(());
        }
        HighlightOutcome::Waiting => {
            println!("{}", "Highlight did not run.".yellow());
        }
        HighlightOutcome::NoContent => {
            println!(
                "{} .{}",
                "Content element not found:".yellow(),
                config.content_class
            );
        }
        HighlightOutcome::NotFound { requested, total } => {
            println!(
                "{} match {} requested, {} on page",
                "Not found:".yellow().bold(),
                requested,
                total
            );
        }
        HighlightOutcome::Highlighted { ordinal } => {
            println!("{} match {}", "Highlighted".green().bold(), ordinal);
            if let Some(mark) = page.dom.first_by_class(page.dom.root(), MARK_CLASS) {
                let block = page.dom.parent(mark).unwrap_or(mark);
                println!("  {}", marked_text(&page.dom, block, mark));
                if html {
                    println!("{}", page.dom.to_html(block));
                }
            }
        }
    }

    println!("{} {}", "URL now:".dimmed(), page.location.href());

    page.run_until_idle();
    if page.dom.first_by_class(page.dom.root(), MARK_CLASS).is_some() {
        return Err("highlight element was not removed".into());
    }
    Ok(())
}

/// Text of `block` with the marked element colored.
fn marked_text(dom: &Dom, block: NodeId, mark: NodeId) -> String {
    let mut out = String::new();
    for node in dom.descendants(block) {
        if let NodeData::Text(text) = dom.data(node) {
            let inside = dom.contains(mark, node);
            if inside {
                out.push_str(&text.black().on_yellow().to_string());
            } else {
                out.push_str(&flatten(text));
            }
        }
    }
    out
}

fn cmd_repl(data: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let value = load_index(data)?;
    let mut page = Page::load(Dom::new(), "/", RecordingViewport::new(), config.clone());
    if !page.install_search(&value) {
        return Err("Search index is malformed.".into());
    }
    let doc_count = page.search().map(|s| s.documents().len()).unwrap_or(0);

    println!("{}", "blogfind interactive mode".green().bold());
    println!(
        "{} posts loaded. Type to search, 'open <n>' to follow a result, 'quit' to exit.\n",
        doc_count
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", ">".cyan().bold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] | ["q"] => break,
            ["help"] | ["?"] => {
                println!("  <text>     - Search as if typed into the search box");
                println!("  open <n>   - Click result n");
                println!("  quit       - Exit");
            }
            ["open", n] => {
                let Some(container) = page.results_container() else {
                    continue;
                };
                let items = page.dom.all_by_class(container, ITEM_CLASS);
                match n.parse::<usize>().ok().and_then(|i| items.get(i.wrapping_sub(1))) {
                    Some(&item) => match page.click(item) {
                        Some(nav) => println!("{} {}", "->".green(), nav.url),
                        None => println!("{}", "Nothing to open.".yellow()),
                    },
                    None => println!("{}", "No such result.".yellow()),
                }
            }
            _ => {
                page.type_query(line);
                page.advance(config.debounce());
                print_results_panel(&page);
            }
        }
        println!();
    }

    Ok(())
}

fn print_results_panel(page: &Page<RecordingViewport>) {
    let Some(container) = page.results_container() else {
        return;
    };
    let dom = &page.dom;

    if dom.first_by_class(container, NO_RESULTS_CLASS).is_some() {
        println!("{}", "No results found.".yellow());
        return;
    }

    for (i, item) in dom.all_by_class(container, ITEM_CLASS).into_iter().enumerate() {
        let title = dom
            .first_by_class(item, TITLE_CLASS)
            .map(|t| dom.text_content(t))
            .unwrap_or_default();
        println!("{:>3}. {}", i + 1, title.cyan());

        let Some(context) = dom.first_by_class(item, CONTEXT_CLASS) else {
            continue;
        };
        let mut line = String::from("     ");
        for &child in dom.children(context) {
            let text = dom.text_content(child);
            if dom.has_class(child, HIGHLIGHT_CLASS) {
                line.push_str(&text.yellow().bold().to_string());
            } else {
                line.push_str(&flatten(&text));
            }
        }
        println!("{line}");
    }
}

/// Collapse newlines so a preview stays on one terminal line.
fn flatten(text: &str) -> String {
    text.replace(['\n', '\r', '\t'], " ")
}
