use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::documents::{DiskFile, FileUpload};
use crate::retrieval::AccessRole;
use crate::service::DocChat;
use crate::session::Session;
use crate::store::{AccessLevel, TenantStore};

fn base_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to determine working directory")
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

/// Ingest uploaded files for a tenant at one access level
#[inline]
pub async fn ingest_documents(
    tenant: &str,
    access: &str,
    files: Vec<PathBuf>,
    max_docs: Option<usize>,
) -> Result<()> {
    let Some(access_level) = AccessLevel::parse(access) else {
        bail!("Unknown access level '{}': expected 'public' or 'admin'", access);
    };
    if files.is_empty() {
        bail!("No files given");
    }

    info!(
        "Ingesting {} file(s) for tenant {} at access level {}",
        files.len(),
        tenant,
        access_level
    );

    let config = Config::load(base_dir()?)?;
    let service = DocChat::new(config).context("Failed to initialize service")?;

    let disk_files: Vec<DiskFile> = files.iter().map(DiskFile::new).collect();
    let uploads: Vec<&dyn FileUpload> = disk_files.iter().map(|f| f as &dyn FileUpload).collect();

    let bar = spinner(&format!(
        "Ingesting {}",
        disk_files.iter().map(|f| f.name()).join(", ")
    ))?;
    let report = service
        .ingest_files(tenant, access_level, &uploads, max_docs)
        .await;
    bar.finish_and_clear();
    let report = report.context("Ingestion failed")?;

    println!("✅ Ingestion complete for tenant '{}'", tenant);
    println!("   Files ingested: {}", report.files_ingested);
    println!("   Chunks stored: {}", report.chunks_added);
    if !report.files_skipped.is_empty() {
        println!(
            "   ⚠️  Skipped (unsupported): {}",
            report.files_skipped.iter().join(", ")
        );
    }

    Ok(())
}

/// Ingest any documents already on disk under businesses/<tenant>/
#[inline]
pub async fn bootstrap_tenant(tenant: &str) -> Result<()> {
    let config = Config::load(base_dir()?)?;
    let service = DocChat::new(config).context("Failed to initialize service")?;

    let bar = spinner(&format!("Bootstrapping tenant '{}'", tenant))?;
    let report = service.bootstrap_tenant(tenant).await;
    bar.finish_and_clear();
    let report = report.context("Bootstrap failed")?;

    match (&report.public, &report.admin) {
        (None, None) => {
            println!("No documents found under businesses/{}/", tenant);
        }
        _ => {
            println!("✅ Bootstrap complete for tenant '{}'", tenant);
            if let Some(public) = &report.public {
                println!(
                    "   Public: {} file(s), {} chunk(s)",
                    public.files_ingested, public.chunks_added
                );
            }
            if let Some(admin) = &report.admin {
                println!(
                    "   Admin: {} file(s), {} chunk(s)",
                    admin.files_ingested, admin.chunks_added
                );
            }
        }
    }

    Ok(())
}

/// Answer one question through the full retrieval and generation path
#[inline]
pub async fn ask_question(tenant: &str, role: &str, question: &str) -> Result<()> {
    let Some(role) = AccessRole::parse(role) else {
        bail!("Unknown role '{}': expected 'user' or 'admin'", role);
    };

    let config = Config::load(base_dir()?)?;
    let service = DocChat::new(config).context("Failed to initialize service")?;

    let mut session = Session::login(tenant, role);
    let bar = spinner("Thinking")?;
    let answer = service.answer_query(&mut session, question).await;
    bar.finish_and_clear();
    session.logout();

    println!("{}", answer);
    Ok(())
}

/// Show chunk counts for a tenant's store
#[inline]
pub async fn show_status(tenant: &str) -> Result<()> {
    let config = Config::load(base_dir()?)?;

    println!("📊 Status for tenant '{}'", tenant);
    println!("{}", "=".repeat(50));

    if !TenantStore::exists(&config.vector_db_path(), tenant) {
        println!("   No documents have been ingested yet");
        return Ok(());
    }

    let store = TenantStore::load(
        &config.vector_db_path(),
        tenant,
        &config.embedding.model,
        config.embedding.dimension as usize,
    )
    .await
    .context("Failed to open vector store")?;

    println!("   📋 Embedding model: {}", store.manifest().embedding_model);
    println!("   🔢 Dimension: {}", store.manifest().dimension);
    println!("   Total chunks: {}", store.count().await?);
    println!(
        "   Public chunks: {}",
        store.count_by_access(AccessLevel::Public).await?
    );
    println!(
        "   Admin chunks: {}",
        store.count_by_access(AccessLevel::Admin).await?
    );

    Ok(())
}
