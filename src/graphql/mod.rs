pub mod domain;
pub mod handlers;
pub mod health;
pub mod schema;

#[cfg(test)]
mod handlers_test;
