mod database {
    pub mod actions;
    pub mod error;
    pub mod filters;
    pub mod form;
    pub mod pagination;
    pub mod payload;
    pub mod projection;
    pub mod schema;
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

pub mod config;
pub mod media;
pub mod routes;
pub mod state;

pub use authentication::*;
pub use cache::cache::*;
pub use constants::*;
pub use database::*;
