// src/bin/brief_server.rs
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::info;
use std::env;

use voice_market_brief::server::{configure, cors_handler, AppState};
use voice_market_brief::{BriefConfig, BriefGenerator};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BriefConfig::from_env().context("Invalid configuration")?;
    let generator =
        BriefGenerator::from_config(&config).context("Failed to initialise brief generator")?;
    let state = web::Data::new(AppState::new(generator));

    let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("SERVER_PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("{}:{}", host, port);

    info!("Market brief server running on http://{}", bind_address);
    info!("  POST /brief    - resolve a query and compose a brief");
    info!("  POST /resolve  - resolve a query to a ticker only");
    info!("  GET  /health   - health check");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure)
            .default_service(web::to(cors_handler))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
