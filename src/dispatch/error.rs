use serde_json::{json, Value};

use crate::store::StoreError;

/// The dispatch error taxonomy. Kinds are contractual: the CLI renderer
/// maps them to text and exit codes, and tests match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Unauthenticated,
    Forbidden,
    NotFound,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Usage => "UsageError",
            ErrorKind::Unauthenticated => "Unauthenticated",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Internal => "InternalError",
        }
    }
}

#[derive(Debug)]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<Value>,
}

impl CommandError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> CommandError {
        CommandError {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        kind: ErrorKind,
        message: impl Into<String>,
        details: Value,
    ) -> CommandError {
        CommandError {
            kind,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn usage(message: impl Into<String>) -> CommandError {
        CommandError::new(ErrorKind::Usage, message)
    }

    pub fn unauthenticated() -> CommandError {
        CommandError::new(ErrorKind::Unauthenticated, "log in first")
    }

    pub fn forbidden(message: impl Into<String>) -> CommandError {
        CommandError::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(entity: &str, key: impl ToString) -> CommandError {
        let key = key.to_string();
        CommandError::with_details(
            ErrorKind::NotFound,
            format!("{} {} not found", entity, key),
            json!({ "entity": entity, "key": key }),
        )
    }

    pub fn response(self) -> Value {
        fail(self.kind, self.message, self.details)
    }
}

impl From<StoreError> for CommandError {
    fn from(e: StoreError) -> CommandError {
        match e {
            StoreError::NotFound { kind, key } => CommandError::not_found(kind, key),
            StoreError::EmailTaken { email } => CommandError::with_details(
                ErrorKind::Validation,
                format!("email {} is already registered", email),
                json!({ "field": "email", "email": email }),
            ),
            StoreError::RoleMismatch {
                expected,
                user_id,
                found,
            } => CommandError::with_details(
                ErrorKind::Validation,
                format!("user {} is a {}, expected a {}", user_id, found, expected),
                json!({ "userId": user_id, "expected": expected, "found": found }),
            ),
            StoreError::NonPositiveMaxScore { max_score } => CommandError::with_details(
                ErrorKind::Validation,
                "max_score must be positive",
                json!({ "field": "max_score", "maxScore": max_score }),
            ),
            StoreError::ScoreOutOfRange { score, max_score } => CommandError::with_details(
                ErrorKind::Validation,
                format!("score {} is outside 0..{}", score, max_score),
                json!({ "field": "score", "score": score, "maxScore": max_score }),
            ),
            StoreError::DuplicateSubmission {
                assignment_id,
                student_id,
            } => CommandError::with_details(
                ErrorKind::Validation,
                format!("assignment {} was already submitted", assignment_id),
                json!({ "assignmentId": assignment_id, "studentId": student_id }),
            ),
            StoreError::AlreadyGraded { submission_id } => CommandError::with_details(
                ErrorKind::Validation,
                format!("submission {} is already graded", submission_id),
                json!({ "submissionId": submission_id }),
            ),
            StoreError::Inconsistent { detail } => {
                CommandError::new(ErrorKind::Internal, detail)
            }
        }
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(e: anyhow::Error) -> CommandError {
        CommandError::new(ErrorKind::Internal, format!("{:#}", e))
    }
}

pub fn ok(result: Value) -> Value {
    json!({
        "ok": true,
        "result": result,
    })
}

pub fn fail(kind: ErrorKind, message: impl Into<String>, details: Option<Value>) -> Value {
    let mut error = json!({
        "kind": kind.as_str(),
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "ok": false,
        "error": error,
    })
}
