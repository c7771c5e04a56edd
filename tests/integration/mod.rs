//! Integration tests against a real SQLite file

mod database_integration;
mod http_api;
