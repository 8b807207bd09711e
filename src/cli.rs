//! CLI module - Command-line interface definitions and handlers

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::Session;
use crate::core::render::{OutputFormat, RenderConfig};

/// windscan - scan sources for class tokens and generate only the CSS they use.
#[derive(Parser, Debug)]
#[command(name = "windscan")]
#[command(
    author,
    version,
    about,
    long_about = r#"windscan scans the files matched by your content globs, extracts every
candidate class token, and compiles the ones the utility catalog knows into a
deterministic stylesheet.

Data commands (scan, tokens, rules) print in the selected format (default: jsonl).
`build` prints CSS, to --out or stdout.

Output formats:
- jsonl: one JSON object per line (best for piping into tools)
- json: a single JSON array
- md: human-friendly Markdown

Examples:
    windscan build --out dist/app.css
    windscan --content 'src/**/*.html' tokens
    windscan rules --format md
    windscan watch --out dist/app.css
"#
)]
pub struct Cli {
    /// Root directory for all operations.
    #[arg(
        long,
        global = true,
        default_value = ".",
        value_name = "ROOT",
        long_help = "Root directory for all operations (defaults to the current directory).\n\n\
Content globs are anchored here, paths in results are relative to it, and the\n\
candidate cache lives in ROOT/.windscan."
    )]
    pub root: PathBuf,

    /// Config file (default: ROOT/windscan.toml).
    #[arg(
        long,
        global = true,
        env = "WINDSCAN_CONFIG",
        value_name = "FILE",
        long_help = "Path to the configuration file, relative to ROOT unless absolute.\n\n\
If omitted, ROOT/windscan.toml is used when present and defaults otherwise.\n\
An explicitly named file that cannot be read is an error."
    )]
    pub config: Option<PathBuf>,

    /// Content glob, overrides content.files (repeatable).
    #[arg(
        long = "content",
        global = true,
        value_name = "GLOB",
        long_help = "Content glob relative to ROOT. Repeat to give several.\n\n\
When given, replaces content.files from the config file.\n\n\
Example: --content 'src/**/*.rs' --content 'index.html'"
    )]
    pub content: Vec<String>,

    /// Output format (jsonl/json/md).
    #[arg(
        long,
        global = true,
        default_value = "jsonl",
        value_name = "FORMAT",
        long_help = "Select the output format for data commands.\n\n\
Supported values:\n\
- jsonl (default)\n\
- json\n\
- md (markdown)\n\n\
Has no effect on `build`, which always prints CSS."
    )]
    pub format: String,

    /// Disable colored output (when applicable).
    #[arg(
        long,
        global = true,
        long_help = "Disable colored output. This is useful when piping to files or when your\n\
terminal does not support ANSI colors."
    )]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Suppress the summary and warnings on stderr. Results are still\n\
printed to stdout."
    )]
    pub quiet: bool,

    /// Verbose mode (more diagnostics).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Enable debug logging on stderr. RUST_LOG, when set, takes precedence."
    )]
    pub verbose: bool,

    /// Pretty-print JSON/JSONL output with indentation.
    #[arg(
        long,
        global = true,
        long_help = "Pretty-print JSON and JSONL output with indentation for human readability.\n\n\
Has no effect on md output or CSS."
    )]
    pub pretty: bool,

    /// Ignore and do not update the candidate cache.
    #[arg(
        long,
        global = true,
        long_help = "Do not read or write ROOT/.windscan.\n\n\
By default unchanged files (same content fingerprint) reuse their cached tokens."
    )]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan content files and output one record per file.
    #[command(
        long_about = "Resolve the content globs, read every matched file, and emit one record\n\
per file: path, file type, fingerprint and extracted tokens. Output is sorted by path.\n\n\
Unreadable files are reported as warnings on stderr and contribute no tokens.\n\n\
Example:\n\
  windscan --content 'src/**/*.rs' scan --format md\n"
    )]
    Scan,

    /// Output the sorted set of candidate tokens.
    #[command(
        long_about = "Emit the union of all tokens extracted from the content set, sorted.\n\n\
Candidates are lossy: most are not utilities. Use `rules` to see which compile.\n\n\
Example:\n\
  windscan tokens --format json\n"
    )]
    Tokens,

    /// Output the compiled utility rules.
    #[command(
        long_about = "Compile the candidate tokens against the catalog and emit one item per\n\
rule in stylesheet order.\n\n\
Example:\n\
  windscan rules --format md\n"
    )]
    Rules,

    /// Generate the stylesheet.
    #[command(
        long_about = "Run one full cycle and write the stylesheet to --out, output.path from\n\
the config, or stdout.\n\n\
A catalog that cannot be loaded fails the build; the output file is left untouched.\n\n\
Examples:\n\
  windscan build --out dist/app.css\n\
  windscan build --minify > app.min.css\n"
    )]
    Build {
        /// Output CSS file (default: output.path or stdout).
        #[arg(long, short, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Minify the stylesheet.
        #[arg(long)]
        minify: bool,
    },

    /// Rebuild the stylesheet whenever content files change.
    #[cfg(feature = "watch")]
    #[command(
        long_about = "Build once, then watch the content roots. Bursts of changes are coalesced\n\
into one incremental cycle; only changed files are rescanned.\n\n\
A failed cycle keeps the last good stylesheet.\n\n\
Example:\n\
  windscan watch --out dist/app.css\n"
    )]
    Watch {
        /// Output CSS file (default: output.path or stdout).
        #[arg(long, short, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Minify the stylesheet.
        #[arg(long)]
        minify: bool,
    },

    /// Manage the candidate cache.
    #[command(long_about = "Manage the candidate cache stored in ROOT/.windscan.\n\n\
Example:\n\
  windscan cache clear\n")]
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Delete the candidate cache.
    Clear,
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let format: OutputFormat = cli.format.parse().unwrap_or_default();
    let render_config = RenderConfig::with_pretty(format, cli.pretty);

    // Get absolute root path
    let root = cli.root.canonicalize().unwrap_or(cli.root);

    if let Commands::Cache { action } = &cli.command {
        return match action {
            CacheCommands::Clear => crate::commands::run_cache_clear(&root, cli.quiet),
        };
    }

    let mut config = crate::config::load_or_default(&root, cli.config.as_deref())?;
    if !cli.content.is_empty() {
        config.content.files = cli.content;
    }

    let session = Session {
        root,
        config,
        render: render_config,
        quiet: cli.quiet,
        use_cache: !cli.no_cache,
    };

    match cli.command {
        Commands::Scan => crate::commands::run_scan(&session),
        Commands::Tokens => crate::commands::run_tokens(&session),
        Commands::Rules => crate::commands::run_rules(&session),
        Commands::Build { out, minify } => crate::commands::run_build(&session, out, minify),
        #[cfg(feature = "watch")]
        Commands::Watch { out, minify } => crate::commands::run_watch(&session, out, minify),
        Commands::Cache { .. } => Ok(()),
    }
}
