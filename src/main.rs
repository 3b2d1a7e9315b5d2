use clap::{Parser, Subcommand};
use prometheus_api::{app, migration, seed, Settings};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "prometheus-api")]
#[command(about = "Portfolio tracking REST API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing tables and serve the API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create all tables
    Createdb,
    /// Drop all tables
    Cleardb,
    /// Drop and recreate all tables
    Resetdb,
    /// Load the initial dataset (or the population dataset with --pop)
    Seed {
        #[arg(long)]
        pop: bool,
    },
    /// Print the generated swagger document
    Swagger,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("prometheus_api=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;

    match cli.command.unwrap_or(Commands::Serve { host: None, port: None }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            let app = app::init(&settings).await?;
            migration::create_all(&app.state.pool, &app.state.registry).await?;
            let listener = TcpListener::bind(settings.bind_addr()).await?;
            tracing::info!("Prometheus API listening on http://{}", listener.local_addr()?);
            axum::serve(listener, app.router()).await?;
        }
        Commands::Createdb => {
            let app = app::init(&settings).await?;
            migration::create_all(&app.state.pool, &app.state.registry).await?;
            tracing::info!("tables created");
        }
        Commands::Cleardb => {
            let app = app::init(&settings).await?;
            migration::drop_all(&app.state.pool, &app.state.registry).await?;
            tracing::info!("tables dropped");
        }
        Commands::Resetdb => {
            let app = app::init(&settings).await?;
            migration::reset_all(&app.state.pool, &app.state.registry).await?;
            tracing::info!("tables reset");
        }
        Commands::Seed { pop } => {
            let app = app::init(&settings).await?;
            migration::create_all(&app.state.pool, &app.state.registry).await?;
            let dataset = if pop { seed::pop_values() } else { seed::init_values() };
            let pieces = seed::process(&dataset, &app.state.registry)?;
            let rows = seed::load(&app.state.pool, &app.state.registry, &pieces).await?;
            tracing::info!(rows, "seed data loaded");
        }
        Commands::Swagger => {
            let app = app::init(&settings).await?;
            println!("{}", serde_json::to_string_pretty(app.api.docs.as_ref())?);
        }
    }
    Ok(())
}
