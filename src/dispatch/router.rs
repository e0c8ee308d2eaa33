use serde_json::json;

use super::error::{fail, ErrorKind};
use super::handlers;
use super::types::{AppState, Command};

pub fn handle_command(state: &mut AppState, cmd: &Command) -> serde_json::Value {
    if let Some(resp) = handlers::accounts::try_handle(state, cmd) {
        return resp;
    }
    if let Some(resp) = handlers::assignments::try_handle(state, cmd) {
        return resp;
    }
    if let Some(resp) = handlers::notices::try_handle(state, cmd) {
        return resp;
    }
    if let Some(resp) = handlers::exports::try_handle(state, cmd) {
        return resp;
    }

    fail(
        ErrorKind::Usage,
        format!("unknown command: {}", cmd.name),
        Some(json!({ "command": cmd.name })),
    )
}
