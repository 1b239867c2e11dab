#[macro_use]
mod ui;
mod commands;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use plsmerge_config::PlsMergeConfig;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(
    name = "plsmerge",
    version,
    about = "Merge and apply PLS pronunciation lexicons"
)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Only show warnings and errors on the console
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge every .pls file of a directory into one lexicon
    Merge {
        /// Directory with the source lexicons [default: lexicons]
        #[arg(short, long)]
        source_dir: Option<PathBuf>,
        /// Output file, overwritten if present [default: merge.pls]
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Indent nested elements by N spaces
        #[arg(long, value_name = "N")]
        indent: Option<usize>,
        /// Omit the <?xml ...?> declaration
        #[arg(long, default_value_t = false)]
        no_declaration: bool,
        /// Extra prefix binding, e.g. --namespace ssml=http://www.w3.org/2001/10/synthesis
        #[arg(long = "namespace", value_name = "PREFIX=URI")]
        namespaces: Vec<String>,
        /// Also write the merged document to stdout
        #[arg(long, default_value_t = false)]
        print: bool,
        /// Merge and report, but do not write the output file
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// List lexemes of every .pls file in a directory
    Scan {
        #[arg(short, long)]
        source_dir: Option<PathBuf>,
        #[arg(long, default_value = "csv", value_parser = ["csv", "json"])]
        format: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Add a lang column (csv only)
        #[arg(long)]
        lang: Option<String>,
    },

    /// Render text as SSML using one or more lexicons
    Ssml {
        /// Lexicon file or directory of .pls files; repeatable
        #[arg(short = 'x', long = "lexicon", required = true)]
        lexicons: Vec<PathBuf>,
        /// xml:lang of the <speak> element [default: en-US]
        #[arg(long)]
        lang: Option<String>,
        /// Text to render; read from stdin when omitted
        #[arg(long)]
        text: Option<String>,
    },
}

trait Runnable {
    fn run(self, cfg: &PlsMergeConfig) -> Result<()>;
}

impl Runnable for Commands {
    fn run(self, cfg: &PlsMergeConfig) -> Result<()> {
        let cmd_name = format!("{:?}", self);
        info!(event = "command_start", cmd = %cmd_name);

        let result = match self {
            Commands::Merge {
                source_dir,
                out,
                indent,
                no_declaration,
                namespaces,
                print,
                dry_run,
            } => commands::merge::run_merge(
                cfg,
                source_dir,
                out,
                indent,
                no_declaration,
                namespaces,
                print,
                dry_run,
            ),
            Commands::Scan {
                source_dir,
                format,
                out,
                lang,
            } => commands::scan::run_scan(cfg, source_dir, format, out, lang),
            Commands::Ssml {
                lexicons,
                lang,
                text,
            } => commands::ssml::run_ssml(cfg, lexicons, lang, text),
        };

        match &result {
            Ok(_) => info!(event = "command_done", cmd = %cmd_name),
            Err(e) => error!(event = "command_failed", cmd = %cmd_name, error = ?e),
        }

        result
    }
}

fn init_tracing(quiet: bool) -> WorkerGuard {
    let file_appender = rolling::daily("logs", "plsmerge.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if quiet { "warn" } else { "info" };
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        );

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _guard = init_tracing(cli.quiet);

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();
    ui::set_color(use_color);

    let cfg = plsmerge_config::load_config()?;
    debug!(event = "config", cfg = ?cfg);

    cli.cmd.run(&cfg)
}
