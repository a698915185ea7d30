use std::net::SocketAddr;

use recipe_share_sdk::{
    config::Config, jwt::SessionKeys, memory::MemoryStore, postgres::PgStore, routes,
    store::Store, AppState, ReferenceCache,
};

async fn serve<S: Store>(state: AppState<S>, address: SocketAddr) {
    log::info!("Listening on http://{address}/api");
    warp::serve(routes(state)).run(address).await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::load()?;
    let keys = SessionKeys::new(&config.jwt_secret, config.session_lifetime_hours)?;
    let cache = ReferenceCache::connect(config.redis_url.as_deref()).await;

    match config.database_url.as_deref() {
        Some(database_url) => {
            let store = PgStore::connect(database_url, config.database_max_connections).await?;
            serve(
                AppState::new(store, keys, cache, config.page_size),
                config.bind_address,
            )
            .await;
        }
        None => {
            log::warn!("DATABASE_URL not set, keeping all data in memory");
            serve(
                AppState::new(MemoryStore::new(), keys, cache, config.page_size),
                config.bind_address,
            )
            .await;
        }
    }

    Ok(())
}
