// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

mod api;
mod config;
mod database;
mod error;
mod import;
mod query;
mod validators;

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the REST API.
    Run,
    /// Load `name,measurement_unit` rows into the ingredient catalog.
    ImportIngredients { path: PathBuf },
    /// Load `name,color,slug` rows into the tag catalog.
    ImportTags { path: PathBuf },
    CreateSuperuser {
        username: String,
        email: String,
        password: String,
    },
}

/// This is where the database lives on-disk unless `FOODGRAM_DATABASE` says
/// otherwise. On Linux it should be like: `~/.local/share/foodgram/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or("failed to get user home directory")?;
    let path = dirs.data_dir().join("foodgram");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        log::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                log::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn serve(conn: database::Connection, config: config::Config) -> Result<()> {
    let addr = config.addr;
    let app = api::router(api::AppState::new(conn, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("server stopped");
    Ok(())
}

fn run(conn: database::Connection, config: config::Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(conn, config))
}

fn create_superuser(
    mut conn: database::Connection,
    username: String,
    email: String,
    password: String,
) -> Result<()> {
    let registration = query::users::Registration {
        username,
        email,
        first_name: "Admin".into(),
        last_name: "Admin".into(),
        password,
    };
    let user = query::users::register_user(&mut conn, &registration, true)?;
    log::info!("created superuser {:?} with id {}", user.username, user.id);
    Ok(())
}

fn main() -> Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    let args = Args::parse();
    let config = config::Config::load()?;
    let conn = database::establish_connection(&config.database)?;
    match args.commands {
        Commands::Run => run(conn, config)?,
        Commands::ImportIngredients { path } => {
            import::import_catalog::<import::IngredientRecord>(conn, path)?
        }
        Commands::ImportTags { path } => import::import_catalog::<import::TagRecord>(conn, path)?,
        Commands::CreateSuperuser {
            username,
            email,
            password,
        } => create_superuser(conn, username, email, password)?,
    }
    Ok(())
}
