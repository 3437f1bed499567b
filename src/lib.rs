pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod export;
pub mod notify;
pub mod records;
pub mod server;
pub mod state;
pub mod store;

#[cfg(test)]
mod tests;
