use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use std::io::Read;
use std::path::{Path, PathBuf};

use inet_docs::highlight::parse_line_spec;
use inet_docs::{DocsConfig, HighlightOptions, Highlighter, LexerRegistry, Pipeline, Style};

/// INET documentation toolkit
#[derive(Parser)]
#[command(name = "inet-docs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Highlighting and page rendering for the INET Framework documentation")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a source file
    Tokens {
        /// Input file, or `-` for standard input
        input: PathBuf,

        /// Language name or alias (default: guessed from the file)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Highlight a source file as HTML
    Highlight {
        /// Input file, or `-` for standard input
        input: PathBuf,

        /// Language name or alias (default: guessed from the file)
        #[arg(short, long)]
        language: Option<String>,

        /// Emit line numbers
        #[arg(long)]
        linenos: bool,

        /// Number of the first line
        #[arg(long, default_value_t = 1)]
        lineno_start: usize,

        /// Lines to emphasize, e.g. `1,3-5`
        #[arg(long)]
        emphasize_lines: Option<String>,

        /// Output file (default: standard output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the registered lexers
    Lexers,

    /// Guess the language of a file
    Guess {
        /// Input file, or `-` for standard input
        input: PathBuf,
    },

    /// Print the CSS of a highlighting style
    Style {
        /// Style name
        #[arg(default_value = "default")]
        name: String,

        /// CSS selector prefixed to every rule
        #[arg(long, default_value = ".highlight")]
        selector: String,
    },

    /// Render a documentation source tree
    Render {
        /// Source directory
        #[arg(short, long, default_value = ".")]
        source: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "_build/rendered")]
        output: PathBuf,

        /// Configuration file (default: `inet-docs.toml` in the source directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of parallel jobs
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Builder format the pages are rendered for
        #[arg(short, long)]
        builder: Option<String>,
    },

    /// Print the effective configuration
    Config {
        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfigFormat {
    Json,
    Yaml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Tokens { input, language } => {
            let text = read_input(&input)?;
            let registry = LexerRegistry::global();
            let lexer = match language {
                Some(name) => registry.require(&name)?,
                None => select_lexer(registry, &input, &text)?,
            };
            for token in lexer.tokenize(&text) {
                println!("{}\t{:?}", token.kind.qualified_name(), token.text);
            }
        }

        Commands::Highlight {
            input,
            language,
            linenos,
            lineno_start,
            emphasize_lines,
            output,
        } => {
            let text = read_input(&input)?;
            let registry = LexerRegistry::global();
            let language = match language {
                Some(name) => name,
                None => select_lexer(registry, &input, &text)?.name().to_string(),
            };
            let emphasize_lines = match emphasize_lines {
                Some(spec) => parse_line_spec(&spec, text.lines().count())
                    .map_err(|e| anyhow::anyhow!("invalid --emphasize-lines: {}", e))?,
                None => Vec::new(),
            };
            let options = HighlightOptions {
                linenos,
                lineno_start,
                emphasize_lines,
            };
            let html = Highlighter::new().highlight(&text, &language, &options);
            match output {
                Some(path) => std::fs::write(&path, html)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", html),
            }
        }

        Commands::Lexers => {
            for lexer in LexerRegistry::global().iter() {
                println!("{}", lexer.name());
                println!("    aliases:   {}", lexer.aliases().join(", "));
                if !lexer.filenames().is_empty() {
                    println!("    filenames: {}", lexer.filenames().join(", "));
                }
                if !lexer.mimetypes().is_empty() {
                    println!("    mimetypes: {}", lexer.mimetypes().join(", "));
                }
            }
        }

        Commands::Guess { input } => {
            let text = read_input(&input)?;
            let lexer = select_lexer(LexerRegistry::global(), &input, &text)?;
            println!("{}", lexer.name());
        }

        Commands::Style { name, selector } => {
            let Some(style) = Style::by_name(&name) else {
                bail!(
                    "Unknown style '{}' (available: {})",
                    name,
                    Style::available().join(", ")
                );
            };
            print!("{}", style.css(&selector));
        }

        Commands::Render {
            source,
            output,
            config,
            jobs,
            builder,
        } => {
            let config_path = config.unwrap_or_else(|| source.join("inet-docs.toml"));
            let mut docs_config = load_config(Some(&config_path))?;
            if let Some(builder) = builder {
                docs_config.builder_format = builder;
            }

            let confdir = config_path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf();
            let mut pipeline = Pipeline::new(docs_config, &confdir)
                .context("Failed to set up the rendering pipeline")?;
            if let Some(jobs) = jobs {
                pipeline = pipeline.with_parallel_jobs(jobs);
            }

            let stats = pipeline
                .render_tree(&source, &output)
                .context("Rendering failed")?;
            info!("Output bytes: {}", stats.output_bytes);

            println!(
                "Rendered {} documents in {:.2}s",
                stats.files_processed,
                stats.build_time.as_secs_f64()
            );
            if stats.files_failed > 0 {
                for (docname, message) in &stats.error_details {
                    eprintln!("  {}: {}", docname, message);
                }
                bail!("{} document(s) failed to render", stats.files_failed);
            }
        }

        Commands::Config { config, format } => {
            let docs_config = load_config(config.as_deref())?;
            let text = match format {
                ConfigFormat::Json => docs_config.to_json()?,
                ConfigFormat::Yaml => docs_config.to_yaml()?,
            };
            println!("{}", text);
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read standard input")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Pick a lexer by file name first, then by content.
fn select_lexer<'r>(
    registry: &'r LexerRegistry,
    path: &Path,
    text: &str,
) -> Result<&'r inet_docs::Lexer> {
    registry
        .for_filename(path)
        .or_else(|| registry.guess(text))
        .with_context(|| format!("Cannot determine the language of {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<DocsConfig> {
    let path = path.filter(|p| p.exists());
    DocsConfig::load(path).context("Failed to load configuration")
}
