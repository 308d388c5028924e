use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{anyhow, Context};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vote_service::config::{Config, StoreBackend};
use vote_service::db::{pool, InMemoryVoteStore, PgVoteStore, VoteStore};
use vote_service::handlers::{self, HealthState};
use vote_service::middleware::{AdminAllowList, IdentityMiddleware, JwtVerifier};
use vote_service::services::VoteService;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn VoteStore>> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL must be set when VOTE_STORE=postgres"))?;

            let pool = pool::connect(url, &config.database)
                .await
                .context("failed to create database pool")?;

            vote_service::MIGRATOR
                .run(&pool)
                .await
                .context("failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            Ok(Arc::new(PgVoteStore::new(pool)))
        }
        StoreBackend::Memory => {
            let seed = config.store.memory_seed_posts.max(0);
            tracing::warn!(
                seeded_posts = seed,
                "Using in-memory vote store; votes are lost on restart"
            );
            Ok(Arc::new(InMemoryVoteStore::with_posts(1..=seed)))
        }
    }
}

fn build_verifier(config: &Config) -> anyhow::Result<Option<Arc<JwtVerifier>>> {
    match &config.auth.jwt_public_key_pem {
        Some(pem) => {
            let verifier = JwtVerifier::from_rsa_pem(pem, config.auth.jwt_issuer.as_deref())
                .context("invalid JWT_PUBLIC_KEY_PEM")?;
            Ok(Some(Arc::new(verifier)))
        }
        None => {
            tracing::warn!("JWT public key not configured; all callers are anonymous");
            Ok(None)
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().map_err(|e| anyhow!("failed to load configuration: {}", e))?;

    tracing::info!("Starting vote-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        env = %config.app.env,
        store = config.store.backend.as_str(),
        admin = config.admin.enabled,
        admins = config.admin.emails.len(),
        "Configuration loaded"
    );

    let store = build_store(&config).await?;
    let verifier = build_verifier(&config)?;

    let vote_service = web::Data::new(VoteService::new(store.clone()));
    let health_state = web::Data::new(HealthState::new(store, config.store.backend.as_str()));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();
    let admins = config
        .admin
        .enabled
        .then(|| AdminAllowList::new(&config.admin.emails));

    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin.is_empty() {
                continue;
            }
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(vote_service.clone())
            .app_data(health_state.clone())
            .wrap(IdentityMiddleware::new(verifier.clone()))
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(|cfg| handlers::configure_routes(cfg, admins.clone()))
            .default_service(web::route().to(handlers::not_found))
    })
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {}", bind_address))?
    .workers(config.app.workers)
    .shutdown_timeout(30)
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let mut server_task = actix_rt::spawn(server);

    tokio::select! {
        result = &mut server_task => {
            result
                .context("HTTP server task panicked")?
                .context("HTTP server failed")?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
            server_task
                .await
                .context("HTTP server task panicked")?
                .context("HTTP server failed")?;
        }
    }

    tracing::info!("vote-service shut down");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
