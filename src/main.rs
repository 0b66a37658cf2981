use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};

use stockroom::{
    config::{self, AppConfig},
    db::{self, DbPool},
    export::{self, pdf},
    services::ReportService,
    AppState,
};

#[derive(Parser)]
#[command(name = "stockroom", about = "Store inventory and order bookkeeping", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Create missing tables and exit
    Migrate,
    /// Write the summary of a committed order as a PDF
    ExportOrder {
        order_id: i32,
        #[arg(long, short, help = "Destination file")]
        out: PathBuf,
    },
    /// Write the current stock levels as a PDF
    ExportStock {
        #[arg(long, short, help = "Destination file")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let pool = db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate || matches!(cli.command, Commands::Migrate) {
        db::run_migrations(&pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db = Arc::new(pool);

    match cli.command {
        Commands::Serve => serve(cfg, db).await,
        Commands::Migrate => {
            println!("Database schema is up to date");
            Ok(())
        }
        Commands::ExportOrder { order_id, out } => {
            let summary = ReportService::new(db)
                .order_summary(order_id)
                .await
                .with_context(|| format!("order {} cannot be exported", order_id))?;
            let text = summary.render_text(&cfg.currency_symbol);
            pdf::write_text_pdf(&out, &text)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Order {} written to {}", order_id, out.display());
            Ok(())
        }
        Commands::ExportStock { out } => {
            let levels = ReportService::new(db).stock_levels().await?;
            pdf::write_text_pdf(&out, &export::render_stock_report(&levels))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Stock levels written to {}", out.display());
            Ok(())
        }
    }
}

async fn serve(cfg: AppConfig, db: Arc<DbPool>) -> Result<()> {
    let addr = cfg.bind_addr();
    let state = AppState::new(db.clone(), Arc::new(cfg));
    let app = stockroom::app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("stockroom listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Ok(pool) = Arc::try_unwrap(db) {
        db::close_pool(pool).await?;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
    info!("Shutdown signal received");
}
