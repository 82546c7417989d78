//! HTTP API: create-on-POST, read-or-schedule on GET.

mod handlers;
mod routes;
mod server;
mod types;

pub use server::HttpServer;
