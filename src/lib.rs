// Library for tests to access modules

pub mod clock;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod resolver;
pub mod routes;
pub mod scheduler;
pub mod seed;
pub mod source;
pub mod store;
pub mod timeframe;
