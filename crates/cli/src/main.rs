use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leadscout_core::domain::lead::{GenerationRequest, Tier};
use leadscout_core::export;
use leadscout_core::llm::openai::OpenAiClient;
use leadscout_core::orchestrator::{GenerationError, Orchestrator};
use leadscout_core::session::SessionStore;
use leadscout_core::time::doha;
use leadscout_core::{config, prompt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TierArg {
    Tier1,
    Tier2,
    Tier3,
}

impl From<TierArg> for Tier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Tier1 => Tier::Tier1,
            TierArg::Tier2 => Tier::Tier2,
            TierArg::Tier3 => Tier::Tier3,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "leadscout")]
struct Args {
    /// Business description to generate leads for.
    #[arg(long)]
    description: String,

    /// Target tier; repeat for several. Defaults to all three.
    #[arg(long = "tier", value_enum)]
    tiers: Vec<TierArg>,

    /// Additional specifications (industry, company size, geography).
    #[arg(long)]
    specs: Option<String>,

    /// Disable Qatar National Vision 2030 alignment context.
    #[arg(long)]
    no_qnv: bool,

    /// Write the markdown export here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Compose and print the prompt without calling the completion API.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let tiers: BTreeSet<Tier> = if args.tiers.is_empty() {
        BTreeSet::from([Tier::Tier1, Tier::Tier2, Tier::Tier3])
    } else {
        args.tiers.into_iter().map(Tier::from).collect()
    };

    let request = GenerationRequest {
        description: args.description,
        tiers,
        extra_specs: args.specs,
        align_qnv2030: !args.no_qnv,
    };

    if args.dry_run {
        let request = request.normalized();
        println!("--- system prompt ---\n{}", prompt::system_prompt());
        println!("\n--- user prompt ---\n{}", prompt::user_prompt(&request));
        return Ok(());
    }

    let llm = OpenAiClient::from_settings(&settings)?;
    let orchestrator = Orchestrator::new(Arc::new(llm), Arc::new(SessionStore::new()));

    let session_id = uuid::Uuid::new_v4();
    let outcome = match orchestrator.generate(session_id, request).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if let GenerationError::Network(inner) | GenerationError::Parse(inner) = &err {
                sentry_anyhow::capture_anyhow(inner);
            }
            tracing::error!(%session_id, error = %err, "generation failed");
            anyhow::bail!("{}", err.user_message());
        }
    };

    let offset = doha::display_offset()?;
    let markdown = export::render_markdown(&outcome.result, offset);

    match args.out {
        Some(path) => {
            std::fs::write(&path, &markdown)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "markdown export written");
        }
        None => print!("{markdown}"),
    }

    tracing::info!(
        leads = outcome.result.leads.len(),
        tokens = outcome.result.cost.total_tokens,
        usd = outcome.result.cost.usd,
        qar = outcome.result.cost.qar,
        "generation complete"
    );

    Ok(())
}

fn init_sentry(settings: &config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
