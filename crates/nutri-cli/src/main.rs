//! Nutri CLI - Command-line interface
//!
//! Usage:
//!   nutri ingest
//!   nutri ask <question>... [--trimester N] [--region R] [--season S] [--diet D]
//!   nutri meals [--region R] [--diet D] [--trimester N] [--season S]
//!   nutri options

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use nutri_core::{AnswerRequest, AppConfig, LoggingConfig, PreferenceQuery, StructuredAnswer};
use nutri_ingest::DatasetLoader;
use nutri_rag::{KnowledgeBase, NutritionAssistant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nutri")]
#[command(about = "Pregnancy nutrition assistant CLI")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables take precedence)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset root, overriding the configuration
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the dataset and print the ingestion report
    Ingest,
    /// Ask one or more questions
    Ask {
        /// Questions to ask
        #[arg(required = true)]
        questions: Vec<String>,

        #[command(flatten)]
        preferences: Preferences,

        /// Health condition (repeatable)
        #[arg(long = "condition")]
        conditions: Vec<String>,

        /// Print answers as JSON
        #[arg(long)]
        json: bool,
    },
    /// List meals matching preferences
    Meals {
        #[command(flatten)]
        preferences: Preferences,

        /// Health condition
        #[arg(long)]
        condition: Option<String>,

        /// Meal type (breakfast, lunch, dinner, snack)
        #[arg(long)]
        meal_type: Option<String>,
    },
    /// Show dataset statistics and available filter values
    Options,
}

#[derive(Args)]
struct Preferences {
    /// Current trimester (1-3)
    #[arg(long)]
    trimester: Option<u8>,

    /// Regional preference (north, south)
    #[arg(long)]
    region: Option<String>,

    /// Current season (summer, winter, monsoon)
    #[arg(long)]
    season: Option<String>,

    /// Dietary preference (veg, nonveg, vegan)
    #[arg(long)]
    diet: Option<String>,
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    if let Some(root) = &cli.data {
        config.dataset.root = root.clone();
    }
    Ok(config)
}

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_knowledge(config: &AppConfig) -> anyhow::Result<KnowledgeBase> {
    let loader = DatasetLoader::from_config(&config.dataset)
        .context("failed to prepare dataset loader")?;
    Ok(KnowledgeBase::load(&loader).with_filter_capacity(config.cache.filter_capacity))
}

fn print_answer(question: &str, answer: &StructuredAnswer) {
    println!("Q: {}", question);
    println!("{}", answer.query_reflection);
    println!();
    println!("{}", answer.answer);

    if !answer.dos.is_empty() {
        println!();
        println!("Do:");
        for item in &answer.dos {
            println!("  + {} - {}", item.item, item.reason);
        }
    }
    if !answer.donts.is_empty() {
        println!();
        println!("Don't:");
        for item in &answer.donts {
            println!("  - {} - {}", item.item, item.reason);
        }
    }

    println!();
    println!(
        "[intent={} source={} time={:.3}s]",
        answer.intent, answer.source, answer.response_time
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Ingest => {
            let knowledge = load_knowledge(&config)?;
            match knowledge.report() {
                Some(report) => println!("{}", serde_json::to_string_pretty(report)?),
                None => println!("No ingestion report available"),
            }
        }
        Commands::Ask {
            questions,
            preferences,
            conditions,
            json,
        } => {
            let knowledge = Arc::new(load_knowledge(&config)?);
            let assistant = NutritionAssistant::new(knowledge, config);

            let requests: Vec<AnswerRequest> = questions
                .iter()
                .map(|question| {
                    let mut request = AnswerRequest::new(question.as_str());
                    request.trimester = preferences.trimester;
                    request.region = preferences.region.clone();
                    request.season = preferences.season.clone();
                    request.diet_type = preferences.diet.clone();
                    request.conditions = conditions.clone();
                    request
                })
                .collect();

            for (request, result) in requests.iter().zip(assistant.answer_batch(&requests).await) {
                match result {
                    Ok(answer) if json => println!("{}", serde_json::to_string_pretty(&answer)?),
                    Ok(answer) => {
                        print_answer(&request.question, &answer);
                        println!();
                    }
                    Err(e) => eprintln!("Q: {}\nError: {}\n", request.question, e),
                }
            }

            tracing::debug!("Cache stats: {:?}", assistant.cache_stats());
        }
        Commands::Meals {
            preferences,
            condition,
            meal_type,
        } => {
            let knowledge = load_knowledge(&config)?;
            let query = PreferenceQuery {
                region: preferences.region,
                diet: preferences.diet,
                trimester: preferences.trimester,
                season: preferences.season,
                condition,
                meal_type,
            };

            let outcome = knowledge.preference_filter(&query);
            if !outcome.relaxed.is_empty() {
                let relaxed: Vec<&str> = outcome.relaxed.iter().map(|d| d.as_str()).collect();
                println!("Relaxed: {}", relaxed.join(", "));
            }
            println!("{} meals", outcome.records.len());
            for record in &outcome.records {
                println!("  {} ({})", record.display_name, record.provenance.source_file);
            }
        }
        Commands::Options => {
            let knowledge = load_knowledge(&config)?;
            let output = serde_json::json!({
                "statistics": knowledge.statistics(),
                "options": knowledge.available_options(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
