use serde_json::{json, Value};

use crate::auth;
use crate::dispatch::error::{ok, CommandError, ErrorKind};
use crate::dispatch::helpers::{gate, optional, required, usage};
use crate::dispatch::types::{AppState, Command, Session};
use crate::export::fmt_ts;
use crate::policy::Role;
use crate::store::{NewUser, User};

pub fn try_handle(state: &mut AppState, cmd: &Command) -> Option<Value> {
    match cmd.name.as_str() {
        "register" => Some(handle_register(state, cmd)),
        "login" => Some(handle_login(state, cmd)),
        "logout" => Some(handle_logout(state, cmd)),
        "whoami" => Some(handle_whoami(state, cmd)),
        "list_users" => Some(handle_list_users(state, cmd)),
        "delete_user" => Some(handle_delete_user(state, cmd)),
        "promote_user" => Some(handle_promote_user(state, cmd)),
        "link_parent" => Some(handle_link_parent(state, cmd)),
        _ => None,
    }
}

fn user_summary(user: &User) -> Value {
    json!({
        "id": user.id,
        "role": user.role.as_str(),
        "fullName": user.full_name,
        "email": user.email,
    })
}

const REGISTER_USAGE: &str = "register <role> <name> <email> <password> [phone] [address]";

/// Open to anonymous callers. Creates the account, sends the welcome
/// notification, and starts a session for the new user.
fn handle_register(state: &mut AppState, cmd: &Command) -> Value {
    let role_token = match required(&cmd.args, 0, REGISTER_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let Some(role) = Role::parse(role_token) else {
        return usage(REGISTER_USAGE).response();
    };
    let full_name = match required(&cmd.args, 1, REGISTER_USAGE) {
        Ok(v) => v.to_string(),
        Err(e) => return e.response(),
    };
    let email = match required(&cmd.args, 2, REGISTER_USAGE) {
        Ok(v) => v.to_string(),
        Err(e) => return e.response(),
    };
    let password = match required(&cmd.args, 3, REGISTER_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let phone = optional(&cmd.args, 4).map(|s| s.to_string());
    let address = optional(&cmd.args, 5).map(|s| s.to_string());

    let (password_hash, password_salt) = auth::hash_password(password);
    let user_id = match state.store.create_user(NewUser {
        role,
        full_name: full_name.clone(),
        email: email.clone(),
        password_hash,
        password_salt,
        phone,
        address,
    }) {
        Ok(v) => v,
        Err(e) => return CommandError::from(e).response(),
    };
    if let Err(e) = state.store.push_notification(
        user_id,
        format!(
            "Welcome, {}! Your account has been created.",
            full_name
        ),
    ) {
        return CommandError::from(e).response();
    }

    let token = auth::mint_token();
    state.session = Some(Session {
        user_id,
        token: token.clone(),
    });
    ok(json!({
        "userId": user_id,
        "role": role.as_str(),
        "fullName": full_name,
        "email": email,
        "token": token,
    }))
}

const LOGIN_USAGE: &str = "login <email> <password>";

/// Replaces any active session. Wrong email and wrong password produce
/// the same message, so login failures do not leak which emails exist.
fn handle_login(state: &mut AppState, cmd: &Command) -> Value {
    let email = match required(&cmd.args, 0, LOGIN_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let password = match required(&cmd.args, 1, LOGIN_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };

    let Some(user) = state.store.user_by_email(email) else {
        return CommandError::new(ErrorKind::Validation, "invalid email or password").response();
    };
    if !auth::verify_password(password, &user.password_salt, &user.password_hash) {
        return CommandError::new(ErrorKind::Validation, "invalid email or password").response();
    }
    let summary = user_summary(user);
    let user_id = user.id;
    let unread = state.store.unread_count(user_id);

    let token = auth::mint_token();
    state.session = Some(Session {
        user_id,
        token: token.clone(),
    });
    ok(json!({
        "token": token,
        "user": summary,
        "unreadNotifications": unread,
    }))
}

fn handle_logout(state: &mut AppState, cmd: &Command) -> Value {
    let actor = match gate(state, &cmd.name) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    state.session = None;
    ok(json!({ "loggedOut": true, "userId": actor.id }))
}

fn handle_whoami(state: &mut AppState, cmd: &Command) -> Value {
    let actor = match gate(state, &cmd.name) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let mut profile = json!({
        "id": actor.id,
        "role": actor.role.as_str(),
        "fullName": actor.full_name,
        "email": actor.email,
        "phone": actor.phone,
        "address": actor.address,
        "createdAt": fmt_ts(actor.created_at),
    });
    if actor.role == Role::Parent {
        let children: Vec<Value> = actor
            .parent_of
            .iter()
            .filter_map(|id| state.store.user(*id).ok())
            .map(user_summary)
            .collect();
        profile["children"] = Value::Array(children);
    }
    ok(profile)
}

fn handle_list_users(state: &mut AppState, cmd: &Command) -> Value {
    if let Err(e) = gate(state, &cmd.name) {
        return e.response();
    }
    let users: Vec<Value> = state
        .store
        .users()
        .map(|u| {
            json!({
                "id": u.id,
                "role": u.role.as_str(),
                "fullName": u.full_name,
                "email": u.email,
                "createdAt": fmt_ts(u.created_at),
            })
        })
        .collect();
    ok(json!({ "count": users.len(), "users": users }))
}

const DELETE_USER_USAGE: &str = "delete_user <email>";

/// Admin only. The cascade is atomic in the store; the payload reports
/// what it removed. Deleting the acting admin also ends the session.
fn handle_delete_user(state: &mut AppState, cmd: &Command) -> Value {
    let email = match required(&cmd.args, 0, DELETE_USER_USAGE) {
        Ok(v) => v.to_string(),
        Err(e) => return e.response(),
    };
    let actor = match gate(state, &cmd.name) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let Some(target_id) = state.store.user_by_email(&email).map(|u| u.id) else {
        return CommandError::not_found("user", &email).response();
    };
    let summary = match state.store.delete_user(target_id) {
        Ok(v) => v,
        Err(e) => return CommandError::from(e).response(),
    };
    if target_id == actor.id {
        state.session = None;
    }
    ok(json!({
        "deletedUserId": target_id,
        "email": email,
        "cascade": {
            "assignments": summary.assignments,
            "submissions": summary.submissions,
            "grades": summary.grades,
            "notifications": summary.notifications,
            "parentLinks": summary.parent_links,
        },
    }))
}

const PROMOTE_USER_USAGE: &str = "promote_user <email> <role>";

fn handle_promote_user(state: &mut AppState, cmd: &Command) -> Value {
    let email = match required(&cmd.args, 0, PROMOTE_USER_USAGE) {
        Ok(v) => v.to_string(),
        Err(e) => return e.response(),
    };
    let role_token = match required(&cmd.args, 1, PROMOTE_USER_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let Some(role) = Role::parse(role_token) else {
        return usage(PROMOTE_USER_USAGE).response();
    };
    if let Err(e) = gate(state, &cmd.name) {
        return e.response();
    }
    let Some(target_id) = state.store.user_by_email(&email).map(|u| u.id) else {
        return CommandError::not_found("user", &email).response();
    };
    if let Err(e) = state.store.set_role(target_id, role) {
        return CommandError::from(e).response();
    }
    if let Err(e) = state
        .store
        .push_notification(target_id, format!("Your role is now {}.", role.as_str()))
    {
        return CommandError::from(e).response();
    }
    ok(json!({
        "userId": target_id,
        "email": email,
        "role": role.as_str(),
    }))
}

const LINK_PARENT_USAGE: &str = "link_parent <parent_email> <student_email>";

/// The only writer of parent_of. Relinking an existing pair succeeds
/// with `linked: false`.
fn handle_link_parent(state: &mut AppState, cmd: &Command) -> Value {
    let parent_email = match required(&cmd.args, 0, LINK_PARENT_USAGE) {
        Ok(v) => v.to_string(),
        Err(e) => return e.response(),
    };
    let student_email = match required(&cmd.args, 1, LINK_PARENT_USAGE) {
        Ok(v) => v.to_string(),
        Err(e) => return e.response(),
    };
    if let Err(e) = gate(state, &cmd.name) {
        return e.response();
    }
    let Some(parent_id) = state.store.user_by_email(&parent_email).map(|u| u.id) else {
        return CommandError::not_found("user", &parent_email).response();
    };
    let Some(student_id) = state.store.user_by_email(&student_email).map(|u| u.id) else {
        return CommandError::not_found("user", &student_email).response();
    };
    let linked = match state.store.link_child(parent_id, student_id) {
        Ok(v) => v,
        Err(e) => return CommandError::from(e).response(),
    };
    ok(json!({
        "parentId": parent_id,
        "studentId": student_id,
        "linked": linked,
    }))
}
