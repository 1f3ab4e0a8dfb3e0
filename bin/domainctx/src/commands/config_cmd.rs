use domainctx_core::{Config, Paths};

/// Show the effective configuration, environment overrides applied.
pub async fn show() -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    let dc = &config.domain_context;

    println!();
    println!("📋 Domain context settings");
    println!("  Config file: {}", paths.config_file().display());
    println!("  Store:       {}", dc.store_path(&paths).display());
    println!("  Prompt:      {}", dc.prompt_template_path(&paths).display());
    println!("  Model:       {}", config.agents.defaults.model);
    println!();
    println!("{}", serde_json::to_string_pretty(dc)?);
    Ok(())
}
