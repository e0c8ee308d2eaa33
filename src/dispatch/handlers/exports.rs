use std::path::Path;

use serde_json::{json, Map, Value};

use crate::dispatch::error::{ok, CommandError};
use crate::dispatch::helpers::{gate, optional, required, usage};
use crate::dispatch::types::{AppState, Command};
use crate::export::{self, ExportFormat, Scope};
use crate::policy::Role;
use crate::store::User;

pub fn try_handle(state: &mut AppState, cmd: &Command) -> Option<Value> {
    match cmd.name.as_str() {
        "export_my_data" => Some(handle_export_my_data(state, cmd)),
        "export_class" => Some(handle_export_class(state, cmd)),
        "export_school" => Some(handle_export_school(state, cmd)),
        _ => None,
    }
}

const DEFAULT_OUT_DIR: &str = "exports";

fn parse_format(token: Option<&str>, spec: &str) -> Result<ExportFormat, CommandError> {
    match token {
        None => Ok(ExportFormat::Xlsx),
        Some(t) => ExportFormat::parse(t).ok_or_else(|| usage(spec)),
    }
}

/// Projection plus artifact writing, shared by the three export
/// commands. Scope authorization has already happened.
fn run_export(
    state: &AppState,
    actor: &User,
    scope: Scope,
    format: ExportFormat,
    out_dir: &str,
) -> Value {
    let snapshot = export::project(&state.store, &scope, actor);
    let summary = match export::write_artifacts(&snapshot, format, Path::new(out_dir), &scope.tag(actor))
    {
        Ok(v) => v,
        Err(e) => return CommandError::from(e).response(),
    };
    let mut tables = Map::new();
    for (name, count) in snapshot.row_counts() {
        tables.insert(name.to_string(), json!(count));
    }
    ok(json!({
        "scope": scope.tag(actor),
        "format": format.as_str(),
        "baseName": summary.base_name,
        "files": summary
            .files
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect::<Vec<_>>(),
        "manifest": summary.manifest_path.to_string_lossy().to_string(),
        "tables": Value::Object(tables),
    }))
}

const MY_DATA_USAGE: &str = "export_my_data [format] [output_dir]";

fn handle_export_my_data(state: &mut AppState, cmd: &Command) -> Value {
    let format = match parse_format(optional(&cmd.args, 0), MY_DATA_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let out_dir = optional(&cmd.args, 1).unwrap_or(DEFAULT_OUT_DIR).to_string();
    let actor = match gate(state, &cmd.name) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    run_export(state, &actor, Scope::Own, format, &out_dir)
}

const CLASS_USAGE: &str = "export_class <class_id> [format] [output_dir]";

/// Admins may export any class; a teacher must own every assignment in
/// it. A class id with no assignments does not exist.
fn handle_export_class(state: &mut AppState, cmd: &Command) -> Value {
    let class_id = match required(&cmd.args, 0, CLASS_USAGE) {
        Ok(v) => v.to_string(),
        Err(e) => return e.response(),
    };
    let format = match parse_format(optional(&cmd.args, 1), CLASS_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let out_dir = optional(&cmd.args, 2).unwrap_or(DEFAULT_OUT_DIR).to_string();
    let actor = match gate(state, &cmd.name) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };

    let mut count = 0usize;
    let mut foreign = false;
    for a in state.store.assignments_in_class(&class_id) {
        count += 1;
        if a.teacher_id != actor.id {
            foreign = true;
        }
    }
    if count == 0 {
        return CommandError::not_found("class", &class_id).response();
    }
    if actor.role == Role::Teacher && foreign {
        return CommandError::forbidden("you may only export classes you own").response();
    }
    run_export(state, &actor, Scope::Class(class_id), format, &out_dir)
}

const SCHOOL_USAGE: &str = "export_school [format] [output_dir]";

fn handle_export_school(state: &mut AppState, cmd: &Command) -> Value {
    let format = match parse_format(optional(&cmd.args, 0), SCHOOL_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let out_dir = optional(&cmd.args, 1).unwrap_or(DEFAULT_OUT_DIR).to_string();
    let actor = match gate(state, &cmd.name) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    run_export(state, &actor, Scope::School, format, &out_dir)
}
