use clap::Parser;
use migration::MigratorTrait;
use miette::{IntoDiagnostic, Result};
use syzygy::{settings, storage, web};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "syzygy",
    version,
    about = "OAuth 2.0 Device Authorization Grant user gateway"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    // init storage (database) and bring the schema up to date
    let db = storage::init(&settings.database).await?;
    migration::Migrator::up(&db, None).await.into_diagnostic()?;

    // ensure a demo client exists so the flow is demonstrable end to end
    ensure_demo_client(&db).await?;

    // start web server
    web::serve(settings, db).await?;
    Ok(())
}

async fn ensure_demo_client(db: &sea_orm::DatabaseConnection) -> Result<()> {
    if storage::get_client_app(db, "demo")
        .await
        .into_diagnostic()?
        .is_none()
    {
        storage::create_client_app(
            db,
            storage::NewClientApp {
                client_id: "demo".to_string(),
                application_name: "Demo Device App".to_string(),
                callback_uri: None,
            },
        )
        .await
        .into_diagnostic()?;
        tracing::info!("Created demo client app (client_id: demo, no registered callback)");
    }
    Ok(())
}
