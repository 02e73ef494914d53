pub mod auth;
pub mod config;
pub mod constants;
pub mod courses;
pub mod extractors;
pub mod logging;
pub mod middleware;
pub mod progress;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
pub mod subjects;
pub mod workers;
