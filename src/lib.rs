// Library for tests to access modules

pub mod analysis;
pub mod config;
pub mod export;
pub mod models;
pub mod prediction;
pub mod readings_repo;
pub mod relay;
pub mod routes;
pub mod session;
pub mod worker;
