pub mod domain;
pub mod export;
pub mod llm;
pub mod orchestrator;
pub mod pricing;
pub mod prompt;
pub mod session;
pub mod time;

pub mod config {
    use anyhow::Context;

    // Keys still carrying the shipped placeholder are treated as unusable.
    const PLACEHOLDER_KEY_PREFIX: &str = "sk-your-key";
    const MIN_API_KEY_LEN: usize = 30;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub openai_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            let key = self
                .openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")?;
            anyhow::ensure!(
                !key.starts_with(PLACEHOLDER_KEY_PREFIX) && key.len() >= MIN_API_KEY_LEN,
                "OPENAI_API_KEY looks like a placeholder or is too short; set a real key in .env"
            );
            Ok(key)
        }
    }

}
