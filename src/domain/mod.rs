mod activity;
mod chat;
mod failure;
mod focus_flow;
mod quick_input;
mod route;
mod summary;
mod timer;
mod week;

pub use activity::*;
pub use chat::*;
pub use failure::*;
pub use focus_flow::*;
pub use quick_input::*;
pub use route::*;
pub use summary::*;
pub use timer::*;
pub use week::*;
