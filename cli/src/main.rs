//! mdtree CLI - Markdown tree rendering tool
//!
//! A command-line tool for re-rendering Markdown, dumping its node tree, and
//! moving documents in and out of a local IPFS node.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use mdtree::render::{to_json, JsonFormat, OutputGrammar, RenderOptions, RenderSettings};
use mdtree::store::{BestEffort, ContentStore, IpfsClient, DEFAULT_HOST, DEFAULT_PORT};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Markdown node tree rendering, inspection and publishing
#[derive(Parser)]
#[command(
    name = "mdtree",
    version,
    about = "Render Markdown node trees to text",
    long_about = "mdtree - Markdown tree renderer.\n\n\
                  Parses Markdown into a node tree and renders it back with \
                  consistent wrapping and escaping. Documents can be fetched from \
                  and published to a local IPFS node."
)]
struct Cli {
    /// IPFS API host
    #[arg(long, global = true, default_value = DEFAULT_HOST)]
    api_host: String,

    /// IPFS API port
    #[arg(long, global = true, default_value_t = DEFAULT_PORT)]
    api_port: u16,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-render a Markdown document
    Render {
        /// Input file path (default or "-": stdin)
        input: Option<PathBuf>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Dump the node tree of a Markdown document as JSON
    Tree {
        /// Input file path (default or "-": stdin)
        input: Option<PathBuf>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output compact JSON (no indentation)
        #[arg(long)]
        compact: bool,

        /// Parse with the extensions of this grammar
        #[arg(long, default_value = "gfm")]
        grammar: GrammarArg,
    },

    /// Fetch a document from IPFS and render it
    Fetch {
        /// IPFS path, e.g. /ipfs/<cid>/README.md
        path: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the fetched bytes unchanged
        #[arg(long)]
        raw: bool,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Publish a document to IPFS
    Publish {
        /// Input file path
        input: PathBuf,

        /// Name stored with the content (default: input file name)
        #[arg(long)]
        name: Option<String>,

        /// Re-render the document before publishing
        #[arg(long)]
        render: bool,

        #[command(flatten)]
        render_args: RenderArgs,
    },

    /// Show IPFS node status (peers and bandwidth)
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

/// Rendering configuration shared by the commands that render.
#[derive(Args, Clone, Default)]
struct RenderArgs {
    /// Wrap width in columns (0 disables wrapping)
    #[arg(short, long, allow_negative_numbers = true)]
    width: Option<i64>,

    /// Output grammar (selects escaping rules)
    #[arg(short, long)]
    grammar: Option<GrammarArg>,

    /// Structural markers to write
    #[arg(short, long)]
    markers: Option<MarkersArg>,

    /// Column measurement for wrapping
    #[arg(long)]
    column_mode: Option<ColumnArg>,

    /// JSON settings file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Output grammar
#[derive(Clone, Copy, ValueEnum)]
enum GrammarArg {
    /// CommonMark core syntax
    Commonmark,
    /// CommonMark with strikethrough and tables
    Gfm,
}

impl GrammarArg {
    fn selector(self) -> &'static str {
        match self {
            GrammarArg::Commonmark => "commonmark",
            GrammarArg::Gfm => "gfm",
        }
    }
}

/// Marker set
#[derive(Clone, Copy, ValueEnum)]
enum MarkersArg {
    /// Inline delimiters and block separation only
    Minimal,
    /// Complete, re-parseable Markdown
    Full,
}

impl MarkersArg {
    fn selector(self) -> &'static str {
        match self {
            MarkersArg::Minimal => "minimal",
            MarkersArg::Full => "full",
        }
    }
}

/// Column measurement
#[derive(Clone, Copy, ValueEnum)]
enum ColumnArg {
    /// One column per character
    Chars,
    /// Terminal display width
    Display,
}

impl ColumnArg {
    fn selector(self) -> &'static str {
        match self {
            ColumnArg::Chars => "chars",
            ColumnArg::Display => "display",
        }
    }
}

impl RenderArgs {
    /// Merge the settings file (if any) with the command-line flags.
    fn resolve(&self) -> Result<RenderOptions, Box<dyn std::error::Error>> {
        let mut settings = match &self.config {
            Some(path) => RenderSettings::from_json(&fs::read_to_string(path)?)?,
            // Re-rendered Markdown should stay Markdown
            None => RenderSettings {
                markers: "full".to_string(),
                ..Default::default()
            },
        };

        if let Some(width) = self.width {
            settings.line_width = width;
        }
        if let Some(grammar) = self.grammar {
            settings.grammar = grammar.selector().to_string();
        }
        if let Some(markers) = self.markers {
            settings.markers = markers.selector().to_string();
        }
        if let Some(mode) = self.column_mode {
            settings.column_mode = mode.selector().to_string();
        }

        Ok(RenderOptions::try_from(&settings)?)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Render {
            input,
            output,
            render,
        } => {
            let options = render.resolve()?;
            let source = read_input(input.as_deref())?;
            let markdown = mdtree::render_markdown(&source, &options)?;

            write_output(output.as_ref(), markdown.as_bytes())?;
            if let Some(path) = output {
                println!("{} Rendered to: {}", "✓".green().bold(), path.display());
            }
        }

        Commands::Tree {
            input,
            output,
            compact,
            grammar,
        } => {
            let source = read_input(input.as_deref())?;
            let grammar: OutputGrammar = grammar.selector().parse()?;
            let tree = mdtree::parse::parse(&source, grammar);

            let format = if compact {
                JsonFormat::Compact
            } else {
                JsonFormat::Pretty
            };
            let json = to_json(&tree, format)?;

            write_output(output.as_ref(), json.as_bytes())?;
            if let Some(path) = output {
                println!(
                    "{} Wrote tree with {} nodes to: {}",
                    "✓".green().bold(),
                    tree.node_count(),
                    path.display()
                );
            }
        }

        Commands::Fetch {
            path,
            output,
            raw,
            render,
        } => {
            let options = render.resolve()?;
            let store = IpfsClient::new(&cli.api_host, cli.api_port)?;

            let pb = create_spinner(&format!("Fetching {}...", path));
            let content = store.fetch(&path);
            pb.finish_and_clear();
            let content = content?;
            info!(path = %path, bytes = content.len(), "fetched content");

            if raw {
                write_output(output.as_ref(), &content)?;
            } else {
                let source = String::from_utf8(content)
                    .map_err(|e| format!("{} is not UTF-8 text: {}", path, e))?;
                let markdown = mdtree::render_markdown(&source, &options)?;
                write_output(output.as_ref(), markdown.as_bytes())?;
            }

            if let Some(out) = output {
                println!("{} Fetched {} to: {}", "✓".green().bold(), path, out.display());
            }
        }

        Commands::Publish {
            input,
            name,
            render,
            render_args,
        } => {
            let mut content = fs::read(&input)?;
            if render {
                let options = render_args.resolve()?;
                let source = String::from_utf8(content)
                    .map_err(|e| format!("{} is not UTF-8 text: {}", input.display(), e))?;
                content = mdtree::render_markdown(&source, &options)?.into_bytes();
            }
            let name = name.unwrap_or_else(|| default_name(&input));
            let store = IpfsClient::new(&cli.api_host, cli.api_port)?;

            let pb = create_spinner(&format!("Publishing {}...", name));
            let published = store.publish(&name, &content);
            pb.finish_and_clear();

            match published {
                BestEffort::Available(id) => {
                    println!("{} Published {}: {}", "✓".green().bold(), name, id.to_string().cyan());
                }
                BestEffort::Unavailable => {
                    return Err(format!(
                        "publish did not happen (is the IPFS node at {} running?)",
                        store.base_url()
                    )
                    .into());
                }
            }
        }

        Commands::Status { json } => {
            let store = IpfsClient::new(&cli.api_host, cli.api_port)?;

            let pb = create_spinner("Querying IPFS node...");
            let peers = store.peer_count();
            let bandwidth = store.bandwidth();
            pb.finish_and_clear();

            if json {
                let status = serde_json::json!({
                    "api": store.base_url(),
                    "online": peers.is_available(),
                    "peers": peers.into_option(),
                    "bandwidth": bandwidth.into_option(),
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(store.base_url(), peers, bandwidth);
            }
        }

        Commands::Version => {
            print_version();
        }
    }

    Ok(())
}

fn print_status(
    api: &str,
    peers: BestEffort<usize>,
    bandwidth: BestEffort<mdtree::store::Bandwidth>,
) {
    println!("{}", "IPFS Node Status".cyan().bold());
    println!("{}", "─".repeat(40));
    println!("{}: {}", "API".bold(), api);

    match peers {
        BestEffort::Available(count) => println!("{}: {}", "Peers".bold(), count),
        BestEffort::Unavailable => {
            println!("{}: {}", "Peers".bold(), "unavailable".yellow());
        }
    }
    match bandwidth {
        BestEffort::Available(bw) => {
            println!("{}: {:.1} B/s", "Rate in".bold(), bw.rate_in);
            println!("{}: {:.1} B/s", "Rate out".bold(), bw.rate_out);
        }
        BestEffort::Unavailable => {
            println!("{}: {}", "Bandwidth".bold(), "unavailable".yellow());
        }
    }
}

fn print_version() {
    println!("{} {}", "mdtree".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Markdown node tree renderer");
    println!();
    println!("Grammars: CommonMark, GFM");
    println!("Content store: IPFS HTTP RPC");
}

fn default_name(input: &Path) -> String {
    input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.md".to_string())
}

fn read_input(input: Option<&Path>) -> io::Result<String> {
    match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path),
        _ => {
            let mut source = String::new();
            io::stdin().lock().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn write_output(path: Option<&PathBuf>, content: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(content)?;
            if !content.ends_with(b"\n") {
                handle.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}
