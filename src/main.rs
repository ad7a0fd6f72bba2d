use clap::{Parser, Subcommand};
use lorcy::config::{self, LorcyConfig};
use lorcy::dataset::DatasetLoader;
use lorcy::imaging::RenderMode;
use lorcy::output;
use lorcy::pipeline::{self, Catalog, GenerateRequest, Pipeline};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Document name used when the decklist comes from stdin.
const DEFAULT_NAME: &str = "deck";

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "lorcy")]
#[command(about = "Print-ready A4 proxy sheets from a card decklist")]
#[command(long_about = "\
Print-ready A4 proxy sheets from a card decklist

A decklist is plain text, one entry per line: a quantity, then any part of
the card's name. Each entry expands to that many copies of the first card
whose name has every word of the fragment (abbreviations of three letters
or more count):

  4 Elsa Snow Queen
  2 stitch rock
  1 Mickey Mouse - Brave Little Tailor

A line without a quantity counts once; blank lines are skipped. Cards are laid out
3 × 3 per A4 page at 300 DPI and written as a single PDF.

Render modes:
  color   card photo, fetched once and cached
  bw      card photo in print grayscale with auto-contrast
  text    synthesized text face (no network)

Run 'lorcy gen-config' to generate a documented lorcy.toml.")]
#[command(version = version_string())]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Command,
}

/// Config file and path overrides shared by every command.
#[derive(clap::Args)]
struct PathArgs {
    /// Config file (default: ./lorcy.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Card dataset JSON file
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Directory for the dataset cache and fetched card images
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Directory the PDF is written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Turn a decklist into a PDF of proxy sheets
    Generate {
        /// Decklist file; '-' or omitted reads stdin
        deckfile: Option<PathBuf>,
        /// Document name (default: the decklist file name)
        #[arg(long)]
        name: Option<String>,
        /// Render mode: color, bw or text
        #[arg(long, default_value_t = RenderMode::default())]
        mode: RenderMode,
    },
    /// List the cards a decklist fragment would match, best first
    Search {
        /// Name fragment
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Re-read the dataset and rewrite the flattened cache
    Flatten,
    /// Print a stock lorcy.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lorcy=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            deckfile,
            name,
            mode,
        } => {
            let config = load_config(&cli.paths)?;
            let decklist = read_decklist(deckfile.as_deref())?;
            let name = name.unwrap_or_else(|| document_name(deckfile.as_deref()));
            let pipeline = Arc::new(Pipeline::from_config(&config)?);
            let handle = pipeline::spawn(
                pipeline,
                GenerateRequest {
                    decklist,
                    name,
                    mode,
                },
            );
            for event in handle.events() {
                for line in output::format_progress_event(&event) {
                    println!("{}", line);
                }
            }
            let report = handle.wait()?;
            output::print_report(&report);
        }
        Command::Search { query } => {
            let query = query.join(" ");
            let config = load_config(&cli.paths)?;
            let catalog = Catalog::new(dataset_loader(&config));
            let hits = catalog.search(&query)?;
            output::print_search_results(&query, &hits);
        }
        Command::Flatten => {
            let config = load_config(&cli.paths)?;
            let loader = dataset_loader(&config);
            let cards = loader.load_fresh()?;
            for line in output::format_flatten_output(cards.len(), &loader.cache_path()) {
                println!("{}", line);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Config file (explicit or `./lorcy.toml`), then command-line overrides.
fn load_config(args: &PathArgs) -> Result<LorcyConfig, config::ConfigError> {
    let mut config = match &args.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(Path::new("."))?,
    };
    if let Some(dataset) = &args.dataset {
        config.paths.dataset = dataset.clone();
    }
    if let Some(dir) = &args.cache_dir {
        config.paths.cache_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.output_dir {
        config.paths.output_dir = Some(dir.clone());
    }
    Ok(config)
}

fn dataset_loader(config: &LorcyConfig) -> DatasetLoader {
    DatasetLoader::new(
        &config.paths.dataset,
        config.paths.resolve_cache_dir(),
        config.dataset.cache_policy,
    )
}

fn read_decklist(deckfile: Option<&Path>) -> std::io::Result<String> {
    match deckfile {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path),
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn document_name(deckfile: Option<&Path>) -> String {
    deckfile
        .filter(|p| *p != Path::new("-"))
        .and_then(Path::file_stem)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_NAME.to_string())
}
