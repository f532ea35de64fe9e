use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use estimator::evaluation::{load_test_set, Evaluator};
use estimator::knowledge_base::KnowledgeBaseAnalyzer;
use estimator::quality::QualityTier;
use estimator::search::{CachedSearch, SearchSummary};
use estimator::{
    format_amount, safe_truncate_ellipsis, ComponentSearch, EstimatorConfig, GeneratorConfig,
    KnowledgeBaseStore, LexicalIndex, LlmProviderFactory, RagComponentGenerator, SearchQuery,
    SemanticSearchEngine,
};

/// Retrieval-augmented cost estimation for construction components
#[derive(Parser)]
#[command(name = "estimator")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, JSON or YAML); ESTIMATOR_* variables override it
    #[arg(short, long, global = true, env = "ESTIMATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Knowledge base file, overrides the configured path
    #[arg(long, global = true)]
    kb: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the lexical index and write it next to the knowledge base
    Index {
        /// Rebuild even when the stored index is current
        #[arg(long)]
        force: bool,
    },

    /// Rank knowledge base components against a task description
    Search {
        query: String,
        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        min_cost: Option<f64>,
        #[arg(long)]
        max_cost: Option<f64>,
        /// Only complete records
        #[arg(long)]
        complete_only: bool,
        #[arg(long)]
        json: bool,
    },

    /// Print knowledge base statistics as JSON
    Summary,

    /// Price a new component with the configured language model
    Generate {
        description: String,
        /// Skip the complete-records-first retrieval
        #[arg(long)]
        all_quality: bool,
    },

    /// Run a held-out test set and report accuracy
    Evaluate {
        test_set: PathBuf,
        #[arg(short, long, default_value = "evaluation_results.json")]
        output: PathBuf,
        /// Pause between cases in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("estimator=info".parse()?))
        .init();

    let cli = Cli::parse();
    let mut config = EstimatorConfig::load(cli.config.as_deref())?;
    if let Some(kb) = cli.kb {
        config.index_path = kb.with_extension("index.json");
        config.knowledge_base_path = kb;
    }

    match cli.command {
        Command::Index { force } => index(&config, force),
        Command::Search {
            query,
            top_k,
            category,
            min_cost,
            max_cost,
            complete_only,
            json,
        } => {
            let search = open_search(&config)?;
            let mut query = SearchQuery::new(query, top_k).with_min_similarity(config.min_similarity);
            if let Some(category) = category {
                query = query.with_category(category);
            }
            if min_cost.is_some() || max_cost.is_some() {
                query = query.with_cost_range(
                    min_cost.unwrap_or(f64::NEG_INFINITY),
                    max_cost.unwrap_or(f64::INFINITY),
                );
            }
            if complete_only {
                query = query.with_quality(QualityTier::Complete);
            }

            let hits = search.search(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
                return Ok(());
            }
            for hit in &hits {
                println!(
                    "{:>6.3}  #{:<5} {:<12} {:<50} {:>14}",
                    hit.score,
                    hit.index,
                    safe_truncate_ellipsis(&hit.component.category, 12),
                    safe_truncate_ellipsis(&hit.component.task_description, 47),
                    format_amount(hit.component.total_price)
                );
            }
            let summary = SearchSummary::from_hits(&query.text, &hits);
            println!(
                "\n{} results, total {} DKK, average {} DKK",
                summary.total_results,
                format_amount(summary.total_cost),
                format_amount(summary.average_cost)
            );
            Ok(())
        }
        Command::Summary => {
            let store = KnowledgeBaseStore::load(&config.knowledge_base_path)?;
            let summary = KnowledgeBaseAnalyzer::new(&store).summary();
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Generate {
            description,
            all_quality,
        } => {
            let search = open_search(&config)?;
            let llm = LlmProviderFactory::from_config(&config)?;
            let generator = RagComponentGenerator::new(search, llm, GeneratorConfig::from(&config));

            let generated = generator.generate(&description, !all_quality).await?;
            println!("{}", serde_json::to_string_pretty(&generated)?);
            Ok(())
        }
        Command::Evaluate {
            test_set,
            output,
            delay_ms,
        } => {
            let cases = load_test_set(&test_set)?;
            let search = open_search(&config)?;
            let llm = LlmProviderFactory::from_config(&config)?;
            let summary = Evaluator::new(search, llm, GeneratorConfig::from(&config))
                .with_delay(Duration::from_millis(delay_ms))
                .run(&cases)
                .await;

            summary
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "{}/{} successful ({:.1}%), average error {:.1}%, results in {}",
                summary.successful_tests,
                summary.total_tests,
                summary.success_rate * 100.0,
                summary.average_error * 100.0,
                output.display()
            );
            Ok(())
        }
    }
}

fn index(config: &EstimatorConfig, force: bool) -> anyhow::Result<()> {
    let store = KnowledgeBaseStore::load(&config.knowledge_base_path)?;
    let index = if force {
        let index = LexicalIndex::build(&store)?;
        index.save(&config.index_path)?;
        index
    } else {
        LexicalIndex::load_or_build(&config.index_path, &store)?
    };
    info!(
        "Index at {}: {} components, {} terms",
        config.index_path.display(),
        index.len(),
        index.vocabulary().len()
    );
    Ok(())
}

fn open_search(config: &EstimatorConfig) -> anyhow::Result<Arc<dyn ComponentSearch>> {
    let store = Arc::new(
        KnowledgeBaseStore::load(&config.knowledge_base_path)
            .with_context(|| format!("loading {}", config.knowledge_base_path.display()))?,
    );
    let index = Arc::new(LexicalIndex::load_or_build(&config.index_path, &store)?);
    let engine: Arc<dyn ComponentSearch> = Arc::new(SemanticSearchEngine::new(store, index)?);

    if config.search_cache_enabled {
        return Ok(Arc::new(CachedSearch::new(
            engine,
            config.search_cache_capacity,
            config.search_cache_ttl_secs,
        )));
    }
    Ok(engine)
}
