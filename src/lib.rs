pub mod config;
pub mod dkim;
pub mod error;
pub mod graphql;
pub mod models;
pub mod openapi;
pub mod registry;
pub mod routes;
pub mod service;
pub mod store;
pub mod validation;
pub mod verification;
pub mod worker;

#[cfg(test)]
mod test_support;
