mod auth;
mod dispatch;
mod export;
mod grading;
mod policy;
mod store;

use std::io::{self, BufRead, Write};

use dispatch::{AppState, Command};
use serde_json::json;

fn main() {
    let mut state = AppState::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match Command::parse(&line) {
            Ok(cmd) => dispatch::handle_command(&mut state, &cmd),
            Err(message) => json!({
                "ok": false,
                "error": { "kind": "UsageError", "message": message },
            }),
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
