use actix_web::{web, App, HttpServer};
use chat_service::repository::PostgresStore;
use chat_service::{config, db, error, logging, metrics, migrations, routes, state::AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = config::Config::from_env()?;

    let pool = db::init_pool(&cfg.database_url, cfg.max_db_connections)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    migrations::run_all(&pool)
        .await
        .map_err(|e| error::AppError::StartServer(format!("migrations: {e}")))?;

    let store = Arc::new(PostgresStore::new(pool));
    let state = web::Data::new(AppState::new(store.clone(), store.clone(), store));

    let bind_addr = format!("{}:{}", cfg.bind_addr, cfg.port);
    tracing::info!(%bind_addr, "starting chat-service");

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .service(web::scope("/api/v1").configure(routes::configure))
            .route("/health", web::get().to(routes::health))
            .route("/metrics", web::get().to(metrics::metrics_handler))
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("run: {e}")))
}
