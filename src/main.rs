use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;

use chat_kg::conversation::message::load_messages;
use chat_kg::error_helper::{print_error_with_help, ErrorType};
use chat_kg::{logging, Config, GraphService, KnowledgeGraph, ServiceError};

#[derive(Parser)]
#[command(name = "chat-kg")]
#[command(about = "Knowledge graphs from chat transcripts", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Graph storage directory (overrides config and CHAT_KG_PATH)
    #[arg(long, global = true, value_name = "DIRECTORY")]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a conversation's graph and store it, replacing any previous one
    Build {
        /// Standardized messages JSON file
        #[arg(value_name = "MESSAGES_JSON")]
        file: PathBuf,

        /// Conversation id to store the graph under
        #[arg(long, value_name = "CONVERSATION_ID")]
        id: String,

        /// Give up (and keep the stored graph) if the build takes longer
        #[arg(long, value_name = "SECONDS")]
        timeout_secs: Option<u64>,
    },

    /// Export a stored graph for visualization
    Export {
        #[arg(value_name = "CONVERSATION_ID")]
        id: String,

        /// Export format (node_link, cytoscape)
        #[arg(short, long, default_value = "node_link")]
        format: String,

        /// Output file path (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show entity and relation statistics of a stored graph
    Stats {
        #[arg(value_name = "CONVERSATION_ID")]
        id: String,
    },

    /// List stored conversation ids
    List,

    /// Delete a stored graph
    Delete {
        #[arg(value_name = "CONVERSATION_ID")]
        id: String,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?.with_env_overrides()?,
        None => Config::from_env()?,
    };
    if let Some(storage) = &cli.storage {
        config.storage_root = storage.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logging::init(&config.log_level);

    let service = GraphService::new(&config).context("Failed to set up entity recognizer")?;

    match run(&service, cli.command) {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast_ref::<ServiceError>().and_then(ErrorType::from_service_error) {
            Some(help) => {
                print_error_with_help(&help);
                std::process::exit(1);
            }
            None => Err(err),
        },
    }
}

fn run(service: &GraphService, command: Commands) -> Result<()> {
    match command {
        Commands::Build {
            file,
            id,
            timeout_secs,
        } => {
            println!("💬 Building knowledge graph: {}", file.display());
            println!();

            if !file.exists() {
                print_error_with_help(&ErrorType::MessagesNotFound(file));
                return Ok(());
            }
            let messages = match load_messages(&file) {
                Ok(messages) => messages,
                Err(e) => {
                    print_error_with_help(&ErrorType::MessagesMalformed(file, format!("{:#}", e)));
                    return Ok(());
                }
            };

            let graph = match timeout_secs {
                Some(secs) => service.rebuild_with_timeout(&id, messages, Duration::from_secs(secs))?,
                None => service.rebuild(&id, &messages)?,
            };

            print_stats(&graph);
            if !graph.warnings.is_empty() {
                println!("{}", format!("⚠️  {} message(s) skipped:", graph.warnings.len()).yellow());
                for warning in &graph.warnings {
                    println!("  - message {}: {}", warning.message_id, warning.reason);
                }
                println!();
            }
            println!("💾 Graph saved as: {}", id.green());
            Ok(())
        }
        Commands::Export { id, format, output } => {
            let Some(graph) = service.load_graph(&id)? else {
                print_error_with_help(&ErrorType::GraphNotFound(id));
                return Ok(());
            };

            let export = service.export_graph(&graph, &format)?;
            match output {
                Some(path) => {
                    export.save(&path)?;
                    eprintln!("✅ Exported {} ({}) to: {}", id, format, path.display());
                }
                None => println!("{}", export.to_json_pretty()?),
            }
            Ok(())
        }
        Commands::Stats { id } => {
            let Some(graph) = service.load_graph(&id)? else {
                print_error_with_help(&ErrorType::GraphNotFound(id));
                return Ok(());
            };
            print_stats(&graph);
            Ok(())
        }
        Commands::List => {
            let ids = service.list_graphs()?;
            if ids.is_empty() {
                println!("No graphs stored in {}", service.store().root().display());
                return Ok(());
            }
            println!("📚 {} stored graph(s):", ids.len());
            for id in ids {
                println!("  - {}", id);
            }
            Ok(())
        }
        Commands::Delete { id } => {
            if service.delete_graph(&id)? {
                println!("🗑️  Deleted graph: {}", id);
            } else {
                println!("Nothing stored for: {}", id);
            }
            Ok(())
        }
    }
}

fn print_stats(graph: &KnowledgeGraph) {
    let stats = graph.stats();

    println!("📊 Graph statistics ({}):", graph.conversation_id.cyan());
    println!("  Messages: {}", stats.total_messages);
    println!("  Entities: {}", stats.total_entities);
    println!("  Mentions: {}", stats.total_mentions);
    println!("  Relations: {}", stats.total_relations);
    println!("  Avg relations per entity: {:.2}", stats.avg_relations_per_entity);
    println!();

    if !stats.entities_by_type.is_empty() {
        println!("🏷️  Entities by type:");
        for (entity_type, count) in &stats.entities_by_type {
            println!("  {}: {}", entity_type, count);
        }
        println!();
    }

    if !stats.top_entities.is_empty() {
        println!("⭐ Top entities:");
        for (i, (name, count)) in stats.top_entities.iter().enumerate() {
            println!("  {}. {} ({} mentions)", i + 1, name, count);
        }
        println!();
    }
}
