//! `carbide-dbctl` -- operator tool for the carbide database.
//!
//! ```text
//! carbide-dbctl migrate   # apply pending migrations
//! carbide-dbctl health    # check the database answers
//! ```
//!
//! # Environment variables
//!
//! | Variable                  | Required | Default | Description                        |
//! |---------------------------|----------|---------|------------------------------------|
//! | `DATABASE_URL`            | yes      | --      | PostgreSQL connection string       |
//! | `DB_MAX_CONNECTIONS`      | no       | `20`    | Pool size                          |
//! | `DB_ACQUIRE_TIMEOUT_SECS` | no       | `30`    | Seconds to wait for a connection   |
//! | `DB_LOCK_TIMEOUT_SECS`    | no       | `300`   | Transaction `lock_timeout`         |
//! | `LOG_FORMAT`              | no       | `text`  | `json` for one JSON object per line |
//! | `RUST_LOG`                | no       | `carbide_db=debug,carbide_dbctl=info` | Log filter |

use anyhow::{bail, Context};
use carbide_db::config::DbConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "carbide_db=debug,carbide_dbctl=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Migrate,
    Health,
}

impl Command {
    fn parse(arg: Option<&str>) -> anyhow::Result<Self> {
        match arg {
            Some("migrate") => Ok(Command::Migrate),
            Some("health") => Ok(Command::Health),
            Some(other) => bail!("unknown command '{other}', expected 'migrate' or 'health'"),
            None => bail!("missing command, expected 'migrate' or 'health'"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let arg = std::env::args().nth(1);
    let command = Command::parse(arg.as_deref())?;

    let config = DbConfig::from_env()?;
    let pool = config
        .connect()
        .await
        .context("failed to connect to database")?;

    match command {
        Command::Migrate => {
            carbide_db::run_migrations(&pool).await?;
        }
        Command::Health => {
            carbide_db::health_check(&pool)
                .await
                .context("database health check failed")?;
            tracing::info!("database is healthy");
        }
    }

    pool.close().await;
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
