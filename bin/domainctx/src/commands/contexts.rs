use domainctx_core::{extract_domain, normalize_domain};
use domainctx_tools::{ToolContext, ToolRegistry};
use serde_json::Value;
use std::io::Write;

use super::open_store;

/// List stored domains.
pub async fn list() -> anyhow::Result<()> {
    let (_, _, store) = open_store()?;
    let map = store.load().await?;

    println!();
    println!("🌐 Domain contexts ({} total)", map.len());
    println!("  File: {}", store.path().display());
    println!();
    if map.is_empty() {
        println!("  (no domains yet)");
    }
    for (domain, entry) in &map {
        println!(
            "  {:<32} {:<26} {} chars",
            domain,
            entry.updated_at,
            entry.context.chars().count()
        );
    }
    println!();
    Ok(())
}

/// Print the context stored for a domain or URL.
pub async fn show(target: &str) -> anyhow::Result<()> {
    let (_, _, store) = open_store()?;
    let domain = match extract_domain(target) {
        d if d.is_empty() => normalize_domain(target),
        d => d,
    };

    match store.entry(&domain).await? {
        Some(entry) => {
            println!();
            println!("📄 {} (updated {})", domain, entry.updated_at);
            println!();
            println!("{}", entry.context);
        }
        None => println!("No saved context for {}", domain),
    }
    Ok(())
}

/// Run the get_domain_context tool for a page URL.
pub async fn context(url: &str) -> anyhow::Result<()> {
    let (_, _, store) = open_store()?;
    let registry = ToolRegistry::with_defaults();
    let ctx = ToolContext::new(url, store);
    let result = registry
        .execute("get_domain_context", ctx, Value::Null)
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Reset the store to an empty document.
pub async fn reset(force: bool) -> anyhow::Result<()> {
    let (_, _, store) = open_store()?;

    if !force {
        print!(
            "This deletes every stored domain context in {}. Continue? [y/N] ",
            store.path().display()
        );
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    store.reset().await?;
    println!("✅ Domain context store reset: {}", store.path().display());
    Ok(())
}
