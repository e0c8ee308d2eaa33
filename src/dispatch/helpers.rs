use crate::dispatch::error::CommandError;
use crate::dispatch::types::AppState;
use crate::policy;
use crate::store::User;

pub fn usage(spec: &str) -> CommandError {
    CommandError::usage(format!("usage: {}", spec))
}

pub fn required<'a>(
    args: &'a [String],
    idx: usize,
    spec: &str,
) -> Result<&'a str, CommandError> {
    args.get(idx).map(|s| s.as_str()).ok_or_else(|| usage(spec))
}

pub fn optional(args: &[String], idx: usize) -> Option<&str> {
    args.get(idx).map(|s| s.as_str())
}

pub fn parse_id(token: &str, spec: &str) -> Result<u64, CommandError> {
    token.parse::<u64>().map_err(|_| usage(spec))
}

pub fn parse_number(token: &str, spec: &str) -> Result<f64, CommandError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| usage(spec))
}

/// The authentication/authorization gate, run after argument parsing.
/// Resolves the session to a user snapshot, then consults the static
/// permission table. Ownership checks stay with the handler.
pub fn gate(state: &AppState, command: &str) -> Result<User, CommandError> {
    let session = state
        .session
        .as_ref()
        .ok_or_else(CommandError::unauthenticated)?;
    let actor = state
        .store
        .user(session.user_id)
        .map_err(|_| CommandError::unauthenticated())?
        .clone();
    if !policy::can(actor.role, command) {
        return Err(CommandError::forbidden(format!(
            "role {} may not run {}",
            actor.role.as_str(),
            command
        )));
    }
    Ok(actor)
}
