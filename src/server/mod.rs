//! main file for the server

pub(crate) mod controller;
pub(crate) mod database;
pub mod model;
mod routes;
pub(crate) mod service;
mod state;
pub(crate) mod util;

use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;
use std::net::SocketAddrV4;
use crate::server::database::memory::MemoryStore;
use crate::server::database::pool::Pool;
use crate::server::database::postgres::PgStore;
use crate::server::database::store::PaymentStore;
use crate::server::model::config::{ServerConfig, StoreBackend};
use crate::server::state::AppState;

/// Run the server
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    match config.store {
        StoreBackend::Memory => {
            info!("using in-memory store with seed data");
            serve(config.addr, MemoryStore::seeded()).await?
        }
        StoreBackend::Postgres => {
            let pool = Pool::connect(&config.db_conn_str, config.db_pool_size).await?;
            info!("connected to postgres with {} pooled connections", pool.idle());
            serve(config.addr, PgStore::new(pool, config.db_timeout)).await?
        }
    };
    Ok(())
}

async fn serve<S: PaymentStore>(addr: SocketAddrV4, store: S) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(store));
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure::<S>)
    })
        .bind(addr)?
        .run()
        .await
}
