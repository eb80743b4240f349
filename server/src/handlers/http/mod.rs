pub mod admin;
pub mod auth;
pub mod partner;
pub mod routes;
pub mod utils;
