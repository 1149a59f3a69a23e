use clap::{Parser, Subcommand};
use doc_chat::Result;
use doc_chat::commands::{ask_question, bootstrap_tenant, ingest_documents, show_status};
use doc_chat::config::{run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "doc-chat")]
#[command(about = "Multi-tenant document Q&A with role-scoped retrieval")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure embedding and generation providers
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest documents for a tenant
    Ingest {
        /// Tenant the documents belong to
        tenant: String,
        /// Access level to store the documents under: "public" or "admin"
        #[arg(long, default_value = "public")]
        access: String,
        /// Files to ingest (.pdf, .txt, .docx)
        files: Vec<PathBuf>,
        /// Override the package quota for this batch
        #[arg(long)]
        max_docs: Option<usize>,
    },
    /// Ingest pre-placed documents from businesses/<tenant>/
    Bootstrap {
        /// Tenant to bootstrap
        tenant: String,
    },
    /// Ask a question over a tenant's documents
    Ask {
        /// Tenant whose documents to query
        tenant: String,
        /// Role of the caller: "user" or "admin"
        #[arg(long, default_value = "user")]
        role: String,
        /// The question to answer
        question: String,
    },
    /// Show chunk counts for a tenant's store
    Status {
        /// Tenant to inspect
        tenant: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let base_dir = std::env::current_dir()?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&base_dir)?;
            } else {
                run_interactive_config(&base_dir)?;
            }
        }
        Commands::Ingest {
            tenant,
            access,
            files,
            max_docs,
        } => {
            ingest_documents(&tenant, &access, files, max_docs).await?;
        }
        Commands::Bootstrap { tenant } => {
            bootstrap_tenant(&tenant).await?;
        }
        Commands::Ask {
            tenant,
            role,
            question,
        } => {
            ask_question(&tenant, &role, &question).await?;
        }
        Commands::Status { tenant } => {
            show_status(&tenant).await?;
        }
    }

    Ok(())
}
