pub mod api;
pub mod bot;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

pub use bot::Bot;
pub use config::Config;
pub use context::{AppContext, ContextHandle};
