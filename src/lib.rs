mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod pagination;
    pub mod postgres;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

mod cache {
    pub mod cache;
}

mod api {
    pub mod handlers;
    pub mod routes;
}

pub mod config;

pub use api::routes::{routes, AppState};
pub use authentication::*;
pub use cache::cache::*;
pub use constants::*;
pub use database::*;
