use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".domainctx"))
            .unwrap_or_else(|| PathBuf::from(".domainctx"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    /// The persisted per-domain context document.
    pub fn domains_context_file(&self) -> PathBuf {
        self.logs_dir().join("domains_context.json")
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.base.join("prompts")
    }

    pub fn domain_context_prompt(&self) -> PathBuf {
        self.prompts_dir().join("domainContextUpdate.md")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.prompts_dir())?;
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
