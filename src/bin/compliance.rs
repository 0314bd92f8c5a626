use std::env;

use anyhow::Result;
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use recruitline::{
    config::AppConfig,
    db,
    expiry::{self, UrgencyTier},
    store::{PgStore, PipelineStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("sweep") => sweep().await?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\nUsage: compliance sweep");
            std::process::exit(1);
        }
        None => {
            eprintln!("Usage: compliance sweep");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Walk the roster and surface every validity window that needs action.
/// Derived on read, so a sweep is always consistent with today's date.
async fn sweep() -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "compliance",
        database_url = %config.redacted_database_url(),
        pool_size = 1,
        "loaded configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let store = PgStore::new(pool);

    let today = Utc::now().date_naive();
    let candidates = store.list_candidates().await?;

    if candidates.is_empty() {
        println!("No candidates found.");
        return Ok(());
    }

    let mut flagged = 0usize;
    for candidate in &candidates {
        let view = expiry::compliance_view(
            candidate.medical_fit_date,
            candidate.visa_issue_date,
            candidate.passport_expiry_date,
            today,
        );

        for assessment in [&view.medical, &view.visa, &view.passport]
            .into_iter()
            .flatten()
        {
            if matches!(assessment.tier, UrgencyTier::Normal) {
                continue;
            }
            flagged += 1;
            println!(
                "{} [{}] {:?}/{:?}: {} day(s) remaining (expires {}) -> {}",
                candidate.full_name,
                candidate.passport_number,
                assessment.policy,
                assessment.tier,
                assessment.remaining_days,
                assessment.expiry_date,
                assessment.actions.join("; "),
            );
        }
    }

    println!(
        "Swept {} candidate(s), {} window(s) need attention.",
        candidates.len(),
        flagged
    );
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
