mod error;
mod handlers;
mod helpers;
mod router;
mod types;

pub use router::handle_command;
pub use types::{AppState, Command};
