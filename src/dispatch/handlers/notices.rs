use serde_json::{json, Value};

use crate::dispatch::error::{ok, CommandError};
use crate::dispatch::helpers::{gate, optional, parse_id, required, usage};
use crate::dispatch::types::{AppState, Command};
use crate::export::fmt_ts;

pub fn try_handle(state: &mut AppState, cmd: &Command) -> Option<Value> {
    match cmd.name.as_str() {
        "notifications" => Some(handle_notifications(state, cmd)),
        _ => None,
    }
}

const NOTIFICATIONS_USAGE: &str = "notifications [read|unread|all|mark_read <id>|clear]";

/// Listings are newest-first. `mark_read` addresses only the actor's own
/// notifications; `clear` marks everything unread as read.
fn handle_notifications(state: &mut AppState, cmd: &Command) -> Value {
    let mode = optional(&cmd.args, 0).unwrap_or("all");
    match mode {
        "all" | "read" | "unread" => {
            let actor = match gate(state, &cmd.name) {
                Ok(v) => v,
                Err(e) => return e.response(),
            };
            let mut rows: Vec<Value> = state
                .store
                .notifications_for(actor.id)
                .filter(|n| match mode {
                    "read" => n.read,
                    "unread" => !n.read,
                    _ => true,
                })
                .map(|n| {
                    json!({
                        "id": n.id,
                        "message": n.message,
                        "read": n.read,
                        "createdAt": fmt_ts(n.created_at),
                    })
                })
                .collect();
            rows.reverse();
            ok(json!({ "count": rows.len(), "notifications": rows }))
        }
        "mark_read" => {
            let id_token = match required(&cmd.args, 1, NOTIFICATIONS_USAGE) {
                Ok(v) => v,
                Err(e) => return e.response(),
            };
            let id = match parse_id(id_token, NOTIFICATIONS_USAGE) {
                Ok(v) => v,
                Err(e) => return e.response(),
            };
            let actor = match gate(state, &cmd.name) {
                Ok(v) => v,
                Err(e) => return e.response(),
            };
            if let Err(e) = state.store.mark_notification_read(actor.id, id) {
                return CommandError::from(e).response();
            }
            ok(json!({ "markedRead": id }))
        }
        "clear" => {
            let actor = match gate(state, &cmd.name) {
                Ok(v) => v,
                Err(e) => return e.response(),
            };
            let cleared = state.store.mark_all_read(actor.id);
            ok(json!({ "cleared": cleared }))
        }
        _ => usage(NOTIFICATIONS_USAGE).response(),
    }
}
