use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, PackageTier};

#[inline]
pub fn run_interactive_config(base_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 doc-chat Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = Config::load(base_dir).context("Failed to load existing configuration")?;

    eprintln!("{}", style("Embedding Provider").bold().yellow());
    eprintln!("Any OpenAI-compatible embeddings endpoint works, including local Ollama.");
    eprintln!();

    config.embedding.base_url = Input::new()
        .with_prompt("Embeddings base URL")
        .default(config.embedding.base_url.clone())
        .interact_text()?;

    config.embedding.model = Input::new()
        .with_prompt("Embedding model")
        .default(config.embedding.model.clone())
        .interact_text()?;

    config.embedding.dimension = Input::new()
        .with_prompt("Embedding dimension")
        .default(config.embedding.dimension)
        .interact_text()?;

    eprintln!();
    eprintln!("{}", style("Generation Provider").bold().yellow());

    config.generation.base_url = Input::new()
        .with_prompt("Chat completions base URL")
        .default(config.generation.base_url.clone())
        .interact_text()?;

    config.generation.primary_model = Input::new()
        .with_prompt("Primary model")
        .default(config.generation.primary_model.clone())
        .interact_text()?;

    let fallback: String = Input::new()
        .with_prompt("Fallback model (empty for none)")
        .allow_empty(true)
        .default(config.generation.fallback_model.clone().unwrap_or_default())
        .interact_text()?;
    config.generation.fallback_model = if fallback.trim().is_empty() {
        None
    } else {
        Some(fallback)
    };

    eprintln!();
    let tiers = [PackageTier::Basic, PackageTier::Standard, PackageTier::Premium];
    let tier_labels = ["basic (1 doc/batch)", "standard (3 docs/batch)", "premium (unlimited)"];
    let selected = Select::new()
        .with_prompt("Package tier")
        .items(&tier_labels)
        .default(tiers.iter().position(|t| *t == config.package).unwrap_or(1))
        .interact()?;
    config.package = tiers[selected];

    eprintln!();
    if let Err(e) = config.validate_secrets() {
        eprintln!("{} {}", style("⚠ Warning:").yellow(), e);
        eprintln!("Set the variable in your environment or .env file before serving queries.");
    } else {
        eprintln!("{}", style("✓ API keys resolved from environment").green());
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(base_dir: &Path) -> Result<()> {
    let config = Config::load(base_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.embedding.base_url).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Dimension: {}", style(config.embedding.dimension).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Generation:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.generation.base_url).cyan());
    eprintln!(
        "  Primary Model: {}",
        style(&config.generation.primary_model).cyan()
    );
    eprintln!(
        "  Fallback Model: {}",
        style(
            config
                .generation
                .fallback_model
                .as_deref()
                .unwrap_or("(none)")
        )
        .cyan()
    );

    eprintln!();
    eprintln!("{}", style("Chunking:").bold().yellow());
    eprintln!(
        "  Window: {} chars, overlap {} chars",
        style(config.chunking.chunk_size).cyan(),
        style(config.chunking.overlap).cyan()
    );

    eprintln!();
    eprintln!("  Package tier: {:?}", style(config.package).cyan());
    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}
