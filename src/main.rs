//! CLI entry point for wordsense.
//!
//! Commands cover collection setup, word insertion and lookup, the offline
//! categorization run, category browsing and the HTTP server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use tracing::Level;

use wordsense::categorize::{CategorizationPipeline, CategorizeOptions, ClusterModel, propagate_snapshot};
use wordsense::display::{
    THEME, create_categorization_table, create_category_table, create_hits_table,
    create_stats_table, with_spinner,
};
use wordsense::storage::{VectorStore, open_store};
use wordsense::titling::ClusterTitler;
use wordsense::types::{SearchQuery, WordItem};
use wordsense::vector::FastEmbedGenerator;
use wordsense::{AdvancedSearchQuery, CategorizeError, Settings, WordService};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Semantic word lookup with automatic categories
#[derive(Parser)]
#[command(
    name = "wordsense",
    version = env!("CARGO_PKG_VERSION"),
    about = "Semantic word lookup with automatic categories",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create .wordsense/settings.toml with default configuration")]
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    #[command(about = "Display active settings")]
    Config,

    #[command(about = "Create the word collection if it does not exist")]
    Setup {
        /// Drop and recreate the collection, deleting every stored word
        #[arg(long)]
        recreate: bool,
    },

    #[command(about = "Embed and store one word")]
    Add {
        word: String,

        #[arg(short, long)]
        meaning: String,

        #[arg(long = "synonym")]
        synonyms: Vec<String>,

        #[arg(long = "antonym")]
        antonyms: Vec<String>,

        #[arg(long = "example")]
        examples: Vec<String>,
    },

    #[command(
        about = "Import words from a JSON array file",
        after_help = "File format:\n  [{\"word\": \"cat\", \"meaning\": \"a small feline\", \"synonyms\": [\"kitty\"]}]"
    )]
    Import { file: PathBuf },

    #[command(about = "Find the words closest in meaning")]
    Search {
        word: String,

        #[arg(short, long, default_value = "3")]
        limit: usize,
    },

    #[command(
        about = "Search with category, meaning keyword and similarity filters",
        after_help = "Examples:\n  wordsense find --category Animals\n  wordsense find --query pet --keyword feline --limit 5"
    )]
    Find {
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(short, long)]
        keyword: Option<String>,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    #[command(
        about = "Cluster all words, title the clusters and label the store",
        after_help = "Examples:\n  wordsense categorize\n  wordsense categorize --clusters 20 --top-n 15"
    )]
    Categorize {
        /// Number of clusters (overrides config)
        #[arg(short = 'k', long)]
        clusters: Option<usize>,

        /// Representative words sent to the titler (overrides config)
        #[arg(long)]
        top_n: Option<usize>,

        /// Hide progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    #[command(about = "Apply a saved category snapshot to the store")]
    Propagate {
        /// Snapshot file (defaults to categorize.snapshot_path)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },

    #[command(about = "List categories with their word counts")]
    Categories,

    #[command(about = "Show category statistics")]
    Stats,

    #[command(about = "List the words in one category")]
    Category {
        name: String,

        #[arg(short, long, default_value = "50")]
        limit: usize,

        #[arg(short, long, default_value = "0")]
        offset: usize,
    },

    #[command(about = "Assign a word to the nearest saved category")]
    Classify {
        word: String,

        /// Cluster model file (defaults to categorize.model_path)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    #[cfg(feature = "http-server")]
    #[command(about = "Start the HTTP API")]
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path).unwrap_or_else(|e| {
            eprintln!(
                "{}",
                THEME.error_with_icon(&format!(
                    "Configuration error loading from {}: {e}",
                    path.display()
                ))
            );
            std::process::exit(1);
        }),
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("{}", THEME.warning_with_icon(&format!("Configuration error: {e}")));
            Settings::default()
        }),
    };
    init_tracing(cli.verbose || settings.debug);

    if let Err(e) = run(cli.command, settings) {
        eprintln!("{}", THEME.error_with_icon(&format!("{e:#}")));
        if let Some(err) = e.downcast_ref::<CategorizeError>() {
            for suggestion in err.recovery_suggestions() {
                eprintln!("  {}", THEME.apply(&THEME.dim, suggestion));
            }
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands, mut settings: Settings) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!(
                "{}",
                THEME.success_with_icon(&format!(
                    "Created configuration file at {}",
                    path.display()
                ))
            );
        }

        Commands::Config => {
            println!("{}", THEME.apply(&THEME.header, "Current Configuration:"));
            println!("{}", "=".repeat(50));
            println!("{}", toml::to_string_pretty(&settings)?);
        }

        Commands::Setup { recreate } => {
            let service = word_service(&settings)?;
            if recreate {
                service.recreate_collection()?;
                println!(
                    "{}",
                    THEME.success_with_icon(&format!(
                        "Recreated collection '{}'",
                        settings.store.collection
                    ))
                );
            } else if service.setup_collection()? {
                println!(
                    "{}",
                    THEME.success_with_icon(&format!(
                        "Created collection '{}'",
                        settings.store.collection
                    ))
                );
            } else {
                println!(
                    "Collection '{}' already exists",
                    settings.store.collection
                );
            }
        }

        Commands::Add {
            word,
            meaning,
            synonyms,
            antonyms,
            examples,
        } => {
            let service = word_service(&settings)?;
            let item = WordItem {
                word: word.clone(),
                meaning,
                synonyms,
                antonyms,
                examples,
            };
            let id = service.add_word(item)?;
            println!(
                "{}",
                THEME.success_with_icon(&format!("Word '{word}' added successfully ({id})"))
            );
        }

        Commands::Import { file } => {
            let items = read_word_file(&file)?;
            let service = word_service(&settings)?;
            let summary = with_spinner(
                &format!("Importing {} words", items.len()),
                true,
                || service.add_words(items),
            );
            println!(
                "{}",
                THEME.success_with_icon(&format!("Inserted {} words", summary.inserted))
            );
            if summary.failed > 0 {
                println!(
                    "{}",
                    THEME.warning_with_icon(&format!("{} words failed", summary.failed))
                );
            }
        }

        Commands::Search { word, limit } => {
            let service = word_service(&settings)?;
            let hits = service.try_search_word(&SearchQuery { word, limit })?;
            print_hits(&hits);
        }

        Commands::Find {
            query,
            category,
            keyword,
            limit,
        } => {
            let service = word_service(&settings)?;
            let hits = service.advanced_search(&AdvancedSearchQuery {
                query,
                category,
                meaning_keyword: keyword,
                limit,
            })?;
            print_hits(&hits);
        }

        Commands::Categorize {
            clusters,
            top_n,
            quiet,
        } => {
            if let Some(k) = clusters {
                settings.categorize.num_clusters = k;
            }
            if let Some(n) = top_n {
                settings.categorize.top_n = n;
            }
            run_categorize(&settings, !quiet)?;
        }

        Commands::Propagate { snapshot } => {
            let path = snapshot.unwrap_or_else(|| settings.categorize.snapshot_path.clone());
            let store = open_store(&settings.store)?;
            let summary = propagate_snapshot(
                store.as_ref(),
                &path,
                settings.categorize.parallel_propagation,
            )?;
            println!(
                "{}",
                THEME.success_with_icon(&format!(
                    "Updated {} words across {} categories",
                    summary.total_updated, summary.categories_processed
                ))
            );
            if summary.total_failed > 0 {
                println!(
                    "{}",
                    THEME.warning_with_icon(&format!(
                        "{} words could not be updated",
                        summary.total_failed
                    ))
                );
            }
        }

        Commands::Categories => {
            let (store, batch) = store_only(&settings)?;
            let categories = queries(store.as_ref(), batch).try_list_categories()?;
            if categories.is_empty() {
                println!("No categories yet. Run 'wordsense categorize' first.");
            } else {
                println!("{}", create_category_table(&categories));
            }
        }

        Commands::Stats => {
            let (store, batch) = store_only(&settings)?;
            let stats = queries(store.as_ref(), batch).try_category_stats()?;
            println!("{}", create_stats_table(&stats));
        }

        Commands::Category {
            name,
            limit,
            offset,
        } => {
            let (store, batch) = store_only(&settings)?;
            let page = queries(store.as_ref(), batch).try_words_in_category(&name, limit, offset)?;
            println!(
                "{} {}",
                THEME.apply(&THEME.category, &page.category),
                THEME.apply(
                    &THEME.dim,
                    format!("(showing {} from offset {})", page.count, page.offset)
                )
            );
            print_hits(&page.words);
            if page.has_more {
                println!(
                    "More words available: --offset {}",
                    page.offset + page.count
                );
            }
        }

        Commands::Classify { word, model } => {
            let path = model.unwrap_or_else(|| settings.categorize.model_path.clone());
            let model = ClusterModel::load(&path)?;
            let service = word_service(&settings)?;
            match service.classify(&word, &model)? {
                Some(found) => println!(
                    "{} -> {} {}",
                    THEME.apply(&THEME.word, &word),
                    THEME.apply(
                        &THEME.category,
                        found.category.as_deref().unwrap_or("(untitled)")
                    ),
                    THEME.apply(
                        &THEME.dim,
                        format!("cluster {} at distance {:.4}", found.cluster_id, found.distance)
                    )
                ),
                None => println!("The model at {} has no clusters", path.display()),
            }
        }

        #[cfg(feature = "http-server")]
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            let service = Arc::new(word_service(&settings)?);
            if let Err(e) = service.setup_collection() {
                tracing::warn!("could not verify collection: {e}");
            }

            let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            // The blocking HTTP client inside the store must be dropped
            // outside the runtime, so this handle outlives `block_on`.
            let held = Arc::clone(&service);
            let result = runtime.block_on(wordsense::server::serve(service, &bind));
            drop(runtime);
            drop(held);
            result?;
        }
    }
    Ok(())
}

fn run_categorize(settings: &Settings, show_progress: bool) -> anyhow::Result<()> {
    let store = open_store(&settings.store)?;
    let titler = ClusterTitler::from_settings(&settings.titling)?;
    let options =
        CategorizeOptions::from_settings(&settings.categorize, settings.store.scan_batch_size);

    let report = CategorizationPipeline::new(store.as_ref(), titler, options)
        .with_progress(show_progress)
        .run()?;

    println!(
        "{}",
        THEME.success_with_icon(&format!(
            "Categorized {} words into {} categories",
            report.total_words, report.clusters
        ))
    );
    println!("{}", create_categorization_table(&report));
    println!(
        "Snapshot saved to {}",
        THEME.apply(&THEME.path, report.snapshot_path.display())
    );
    println!(
        "Updated {} words, {} failed",
        THEME.apply(&THEME.number, report.propagation.total_updated),
        THEME.apply(&THEME.number, report.propagation.total_failed)
    );
    Ok(())
}

fn word_service(settings: &Settings) -> anyhow::Result<WordService> {
    let store = open_store(&settings.store)?;
    let embedder = with_spinner("Loading embedding model", true, || {
        FastEmbedGenerator::new(
            &settings.embedding.model,
            settings.embedding.resolved_cache_dir(),
            false,
        )
    })?;
    Ok(WordService::new(
        store,
        Arc::new(embedder),
        settings.store.scan_batch_size,
    ))
}

fn store_only(settings: &Settings) -> anyhow::Result<(Arc<dyn VectorStore>, usize)> {
    Ok((open_store(&settings.store)?, settings.store.scan_batch_size))
}

fn queries(store: &dyn VectorStore, batch: usize) -> wordsense::CategoryQueries<'_> {
    wordsense::CategoryQueries::new(store, batch)
}

fn read_word_file(path: &Path) -> anyhow::Result<Vec<WordItem>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a JSON array of words", path.display()))
}

fn print_hits(hits: &[wordsense::WordHit]) {
    if hits.is_empty() {
        println!("No matching words");
    } else {
        println!("{}", create_hits_table(hits));
    }
}
