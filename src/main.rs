use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::time::Duration;

use motdujour::config::Config;
use motdujour::db::{AppState, create_pool, init_db, migrations, queries};
use motdujour::handlers;
use motdujour::models::{CreateTeam, CreateUser};
use motdujour::orchestrator::OrchestratorClient;
use motdujour::scheduler;

#[derive(Parser, Debug)]
#[command(name = "motdujour")]
#[command(about = "Delivery backend for Mot du jour daily messages")]
struct Cli {
    /// Seed the database with dev data (a family team and a few recipients)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with dev data for testing.
/// Creates: a family team with two members who have phones, plus one
/// user without a phone (never a recipient).
/// Only runs in dev mode and when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let count = queries::count_users(&conn).expect("Failed to count users");
    if count > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV DATA");
    tracing::info!("============================================");

    let team = queries::create_team(
        &conn,
        &CreateTeam {
            name: "Famille Martin".to_string(),
            plan_name: Some("Family".to_string()),
            subscription_status: Some("active".to_string()),
        },
    )
    .expect("Failed to create dev team");

    let seeds = [
        ("marie@motdujour.local", Some("0612345678"), "owner"),
        ("paul@motdujour.local", Some("0698765432"), "family"),
        ("nophone@motdujour.local", None, "personal"),
    ];

    for (email, phone, role) in seeds {
        let user = queries::create_user(
            &conn,
            &CreateUser {
                email: email.to_string(),
                name: None,
                phone_number: phone.map(String::from),
                phone_country: phone.map(|_| "33".to_string()),
                role: role.to_string(),
            },
        )
        .expect("Failed to create dev user");

        if role != "personal" {
            queries::add_team_member(&conn, &team.id, &user.id, role)
                .expect("Failed to add dev team member");
        }

        tracing::info!("User: {} ({}) role={}", user.email, user.id, user.role);
    }

    tracing::info!("Team: {} ({})", team.name, team.id);
    tracing::info!("============================================");
}

fn purge_settled_triggers(state: &AppState, retention_days: i64) {
    if retention_days <= 0 {
        return;
    }
    let conn = state.db.get().expect("Failed to get db connection for purge");
    match queries::purge_old_triggers(&conn, retention_days) {
        Ok(count) if count > 0 => {
            tracing::info!(
                "Purged {} settled triggers older than {} days",
                count,
                retention_days
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("Failed to purge old triggers: {}", e);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "motdujour=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");

    // Migrate, then bring the schema up to date
    {
        let mut conn = db_pool.get().expect("Failed to get connection");
        migrations::run_migrations(
            &mut conn,
            &config.database_path,
            config.migration_backup_count,
        )
        .expect("Failed to run database migrations");
        init_db(&conn).expect("Failed to initialize database");
    }

    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET not set: every webhook call will be rejected");
    }
    if config.orchestrator_webhook_url.is_none() {
        tracing::warn!("ORCHESTRATOR_WEBHOOK_URL not set: triggers cannot reach the orchestrator");
    }

    let state = AppState {
        db: db_pool,
        webhook_secret: config.webhook_secret.clone(),
        cron_secret: config.cron_secret.clone(),
        orchestrator: OrchestratorClient::new(
            config.orchestrator_webhook_url.clone(),
            Duration::from_secs(config.orchestrator_timeout_secs),
        ),
    };

    purge_settled_triggers(&state, config.trigger_retention_days);

    // Seed dev data if --seed flag is passed (only in dev mode)
    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set MOTDUJOUR_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    // Fire triggers armed before a restart, then keep polling
    scheduler::spawn_trigger_poller(
        state.clone(),
        Duration::from_secs(config.trigger_poll_interval_secs),
    );

    let app = Router::new()
        .merge(handlers::router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Mot du jour server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
        tracing::info!("Ephemeral cleanup complete");
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
