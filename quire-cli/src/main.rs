//! quire command line front end.
//!
//! Reads a JSON box-tree document, lays it out on pages and prints the
//! result.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use owo_colors::OwoColorize;
use quire_layout::{Document, Fragment, FragmentKind, LayoutConfig, PageBox, PagedDocument, layout_document};

/// Lay out a styled box tree on pages.
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Print the page tree
    quire document.json

    # Use a configuration file and print JSON
    quire document.json --config quire.toml --format json

    # Show pagination decisions
    quire -vv document.json
"#)]
struct Cli {
    /// Input document (JSON)
    #[arg(value_name = "FILE")]
    document: PathBuf,

    /// Layout configuration (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Tree)]
    format: Format,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Pages as JSON
    Json,
    /// Indented fragment tree
    Tree,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let text = fs::read_to_string(&cli.document)
        .with_context(|| format!("reading {}", cli.document.display()))?;
    let document =
        Document::from_json_str(&text).with_context(|| format!("loading {}", cli.document.display()))?;
    let paged = layout_document(&document, &config).context("laying out the document")?;

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&paged)?),
        Format::Tree => {
            for page in &paged.pages {
                print_page(page);
            }
        }
    }
    print_summary(&paged);
    Ok(())
}

/// `warn` by default, raised by `-v`, overridden by `RUST_LOG`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    LayoutConfig::from_toml_str(&text).with_context(|| format!("loading {}", path.display()))
}

fn print_summary(paged: &PagedDocument) {
    let status = if paged.stable {
        "stable".green().to_string()
    } else {
        "not stable".yellow().to_string()
    };
    eprintln!(
        "{} {} pages, {} passes, {status}",
        "quire:".bold(),
        paged.pages.len(),
        paged.passes
    );
}

/// Print one page and everything on it.
fn print_page(page: &PageBox) {
    let side = if page.right { "right" } else { "left" };
    let blank = if page.blank { ", blank" } else { "" };
    println!(
        "=== Page {} ({side}{blank}, {:.0}x{:.0}) ===",
        page.number, page.width, page.height
    );
    if !page.strings.is_empty() {
        let strings: Vec<String> = page.strings.iter().map(|(k, v)| format!("{k}={v:?}")).collect();
        println!("  strings: {}", strings.join(" "));
    }
    for fragment in page
        .margin_boxes
        .iter()
        .chain(page.root.iter())
        .chain(page.fixed_boxes.iter())
        .chain(page.footnote_area.iter())
    {
        print_fragment(fragment, 1);
    }
    println!();
}

/// Recursively print a fragment with its dimensions.
fn print_fragment(fragment: &Fragment, depth: usize) {
    let indent = "  ".repeat(depth);
    let dims = &fragment.dimensions;

    let name = match &fragment.kind {
        FragmentKind::Text { text, .. } => {
            let preview: String = text.chars().take(30).collect();
            let suffix = if text.chars().count() > 30 { "..." } else { "" };
            format!("Text(\"{preview}{suffix}\")")
        }
        FragmentKind::MarginBox { slot } => format!("MarginBox({slot})"),
        FragmentKind::Replaced { url } => format!("Replaced({url})"),
        other => format!("{other:?}"),
    };
    let id = fragment.box_id.map(|id| format!(" #{}", id.0)).unwrap_or_default();
    let mut flags = String::new();
    if fragment.is_continuation {
        flags.push_str(" continued");
    }
    if fragment.is_broken {
        flags.push_str(" broken");
    }

    println!("{indent}[{name}{id}]{flags}");
    println!(
        "{indent}  content: x={:.1} y={:.1} w={:.1} h={:.1}",
        dims.content.x, dims.content.y, dims.content.width, dims.content.height
    );
    let m = dims.margin;
    if m.top != 0.0 || m.right != 0.0 || m.bottom != 0.0 || m.left != 0.0 {
        println!(
            "{indent}  margin: t={:.1} r={:.1} b={:.1} l={:.1}",
            m.top, m.right, m.bottom, m.left
        );
    }

    for child in &fragment.children {
        print_fragment(child, depth + 1);
    }
}
