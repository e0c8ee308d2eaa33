use crate::store::{Store, UserId};

/// One parsed command line: the command name plus its positional
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    /// Tokenizes a raw line. Tokens split on whitespace; double quotes
    /// group a multi-word argument (`register student "Alice Smith" ...`)
    /// and may produce an empty token (`""`). Quotes do not nest.
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut tokens: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut started = false;
        let mut in_quotes = false;
        for ch in line.chars() {
            match ch {
                '"' => {
                    in_quotes = !in_quotes;
                    started = true;
                }
                c if c.is_whitespace() && !in_quotes => {
                    if started {
                        tokens.push(std::mem::take(&mut current));
                        started = false;
                    }
                }
                c => {
                    current.push(c);
                    started = true;
                }
            }
        }
        if in_quotes {
            return Err("unterminated quote".to_string());
        }
        if started {
            tokens.push(current);
        }
        if tokens.is_empty() {
            return Err("empty command".to_string());
        }
        let name = tokens.remove(0);
        Ok(Command { name, args: tokens })
    }
}

/// The active login. The token is the capability handed back to the
/// caller at login; the core only ever compares it for display.
pub struct Session {
    pub user_id: UserId,
    pub token: String,
}

/// Process-owned mutable context handed to every handler: the entity
/// store plus at most one active session.
pub struct AppState {
    pub store: Store,
    pub session: Option<Session>,
}

impl AppState {
    pub fn new() -> AppState {
        AppState {
            store: Store::new(),
            session: None,
        }
    }
}
