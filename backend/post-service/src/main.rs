use actix_web::{web, App, HttpServer};
use anyhow::Context;
use post_service::db::{PgPostRepository, PgUserRepository};
use post_service::handlers;
use post_service::media::{MediaUploader, S3ObjectStorage, UploadLimits};
use post_service::services::{PostService, PostStore};
use s3_utils::S3Client;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

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

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = match post_service::Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            anyhow::bail!("failed to load configuration: {}", e);
        }
    };

    tracing::info!(env = %config.app.env, "Starting post-service");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database.url)
        .await
        .context("failed to connect to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    tokio::fs::create_dir_all(&config.media.tmp_dir)
        .await
        .with_context(|| format!("failed to create {}", config.media.tmp_dir.display()))?;

    let s3 = S3Client::connect(config.s3.clone()).await;
    if let Err(e) = s3.health_check().await {
        tracing::warn!(error = %e, "S3 bucket not reachable at startup");
    }
    let storage = Arc::new(S3ObjectStorage::new(s3.operations()));

    let store = PostStore::new(
        Arc::new(PgPostRepository::new(pool.clone())),
        Arc::new(PgUserRepository::new(pool.clone())),
        storage.clone(),
        config.store_timeout,
    );
    let uploader = MediaUploader::new(storage, UploadLimits::from(&config.media));
    let service = web::Data::new(PostService::new(store, uploader));
    let pool_data = web::Data::new(pool);

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("HTTP server listening on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(pool_data.clone())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(post_service::metrics::serve_metrics))
            .route("/api/v1/health", web::get().to(handlers::health))
            .service(web::scope("/api/v1").configure(handlers::configure))
    })
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {}", bind_address))?
    .run()
    .await
    .context("HTTP server terminated")?;

    tracing::info!("post-service shut down");
    Ok(())
}
