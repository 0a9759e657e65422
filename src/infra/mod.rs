mod api;
mod config;
mod state;

pub use api::*;
pub use config::*;
pub use state::*;
