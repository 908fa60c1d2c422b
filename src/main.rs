use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Duration;

use prova_server::{app_state::AppState, config::Config, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let host = config.web_server_host.clone();
    let port = config.web_server_port;

    let state = AppState::new(config.clone())
        .await
        .map_err(|err| std::io::Error::other(err.to_string()))?;

    // Lazy timeout resolution handles live attempts; this sweep catches the
    // ones nobody touches again.
    let sweep_service = state.attempt_service.clone();
    let retention = Duration::hours(config.abandon_after_hours);
    let sweep_interval = std::time::Duration::from_secs(config.sweep_interval_seconds);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            match sweep_service.abandon_stale(retention).await {
                Ok(0) => {}
                Ok(swept) => log::info!("abandonment sweep settled {} stale attempts", swept),
                Err(err) => log::warn!("abandonment sweep failed: {}", err),
            }
        }
    });

    log::info!("starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .service(handlers::start_attempt)
            .service(handlers::get_current_question)
            .service(handlers::submit_answer)
            .service(handlers::finish_test)
            .service(handlers::get_result)
            .service(handlers::get_attempt_history)
            .service(handlers::health_check)
            .service(handlers::health_check_live)
            .service(handlers::health_check_ready)
    })
    .bind((host, port))?
    .run()
    .await
}
