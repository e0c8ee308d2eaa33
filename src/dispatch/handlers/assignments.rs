use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};

use crate::dispatch::error::{ok, CommandError, ErrorKind};
use crate::dispatch::helpers::{gate, optional, parse_id, parse_number, required, usage};
use crate::dispatch::types::{AppState, Command};
use crate::export::fmt_ts;
use crate::grading;
use crate::policy::Role;
use crate::store::{Assignment, Grade, NewAssignment, NewGrade, NewSubmission, Store};

pub fn try_handle(state: &mut AppState, cmd: &Command) -> Option<Value> {
    match cmd.name.as_str() {
        "create_assignment" => Some(handle_create_assignment(state, cmd)),
        "list_assignments" => Some(handle_list_assignments(state, cmd)),
        "submit_assignment" => Some(handle_submit_assignment(state, cmd)),
        "grade_assignment" => Some(handle_grade_assignment(state, cmd)),
        "view_grades" => Some(handle_view_grades(state, cmd)),
        _ => None,
    }
}

const CREATE_USAGE: &str =
    "create_assignment <title> <description> <due_date> <max_score> [class_id]";

fn handle_create_assignment(state: &mut AppState, cmd: &Command) -> Value {
    let title = match required(&cmd.args, 0, CREATE_USAGE) {
        Ok(v) => v.to_string(),
        Err(e) => return e.response(),
    };
    let description = match required(&cmd.args, 1, CREATE_USAGE) {
        Ok(v) => v.to_string(),
        Err(e) => return e.response(),
    };
    let due_token = match required(&cmd.args, 2, CREATE_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let Ok(due_date) = NaiveDate::parse_from_str(due_token, "%Y-%m-%d") else {
        return usage(CREATE_USAGE).response();
    };
    let max_token = match required(&cmd.args, 3, CREATE_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let max_score = match parse_number(max_token, CREATE_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let actor = match gate(state, &cmd.name) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let class_id = optional(&cmd.args, 4)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("class_{}", actor.id));

    let assignment_id = match state.store.create_assignment(NewAssignment {
        teacher_id: actor.id,
        title: title.clone(),
        description,
        due_date,
        max_score,
        class_id: class_id.clone(),
    }) {
        Ok(v) => v,
        Err(e) => return CommandError::from(e).response(),
    };
    ok(json!({
        "assignmentId": assignment_id,
        "title": title,
        "dueDate": due_date.to_string(),
        "maxScore": max_score,
        "classId": class_id,
    }))
}

fn assignment_row(a: &Assignment) -> Value {
    json!({
        "id": a.id,
        "teacherId": a.teacher_id,
        "title": a.title,
        "description": a.description,
        "dueDate": a.due_date.to_string(),
        "maxScore": a.max_score,
        "classId": a.class_id,
    })
}

/// Teachers see their own assignments with submission tallies; students
/// see every assignment with their own submitted/graded flags; parents
/// and admins get the plain list.
fn handle_list_assignments(state: &mut AppState, cmd: &Command) -> Value {
    let actor = match gate(state, &cmd.name) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let store = &state.store;
    let rows: Vec<Value> = match actor.role {
        Role::Teacher => store
            .assignments_by_teacher(actor.id)
            .map(|a| {
                let mut row = assignment_row(a);
                let mut submitted = 0usize;
                let mut graded = 0usize;
                for s in store.submissions_for_assignment(a.id) {
                    submitted += 1;
                    if store.grade_for_submission(s.id).is_some() {
                        graded += 1;
                    }
                }
                row["submissionCount"] = json!(submitted);
                row["gradedCount"] = json!(graded);
                row
            })
            .collect(),
        Role::Student => store
            .assignments()
            .map(|a| {
                let mut row = assignment_row(a);
                let submission = store.submission_for(a.id, actor.id);
                row["submitted"] = json!(submission.is_some());
                row["graded"] = json!(submission
                    .map(|s| store.grade_for_submission(s.id).is_some())
                    .unwrap_or(false));
                row
            })
            .collect(),
        Role::Parent | Role::Admin => store.assignments().map(assignment_row).collect(),
    };
    ok(json!({ "count": rows.len(), "assignments": rows }))
}

const SUBMIT_USAGE: &str = "submit_assignment <assignment_id> <text>";

fn handle_submit_assignment(state: &mut AppState, cmd: &Command) -> Value {
    let id_token = match required(&cmd.args, 0, SUBMIT_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let assignment_id = match parse_id(id_token, SUBMIT_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let text = match required(&cmd.args, 1, SUBMIT_USAGE) {
        Ok(v) => v.to_string(),
        Err(e) => return e.response(),
    };
    if text.trim().is_empty() {
        return CommandError::usage("submission text must not be empty").response();
    }
    let actor = match gate(state, &cmd.name) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };

    let (teacher_id, title) = match state.store.assignment(assignment_id) {
        Ok(a) => (a.teacher_id, a.title.clone()),
        Err(e) => return CommandError::from(e).response(),
    };
    let submission_id = match state.store.create_submission(NewSubmission {
        assignment_id,
        student_id: actor.id,
        text,
        submitted_at: Utc::now(),
    }) {
        Ok(v) => v,
        Err(e) => return CommandError::from(e).response(),
    };
    let (submitted_at, is_late) = match state.store.submission(submission_id) {
        Ok(s) => (s.submitted_at, s.is_late),
        Err(e) => return CommandError::from(e).response(),
    };
    if let Err(e) = state.store.push_notification(
        teacher_id,
        format!(
            "{} has submitted {}work for {}",
            actor.full_name,
            if is_late { "late " } else { "" },
            title
        ),
    ) {
        return CommandError::from(e).response();
    }
    ok(json!({
        "submissionId": submission_id,
        "assignmentId": assignment_id,
        "submittedAt": fmt_ts(submitted_at),
        "isLate": is_late,
    }))
}

const GRADE_USAGE: &str =
    "grade_assignment <assignment_id> <student_email> <score> [comments]";

/// Teachers grade only their own assignments; the (assignment, student)
/// pair addresses the submission, which is unique.
fn handle_grade_assignment(state: &mut AppState, cmd: &Command) -> Value {
    let id_token = match required(&cmd.args, 0, GRADE_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let assignment_id = match parse_id(id_token, GRADE_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let student_email = match required(&cmd.args, 1, GRADE_USAGE) {
        Ok(v) => v.to_string(),
        Err(e) => return e.response(),
    };
    let score_token = match required(&cmd.args, 2, GRADE_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let score = match parse_number(score_token, GRADE_USAGE) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let comments = if cmd.args.len() > 3 {
        Some(cmd.args[3..].join(" "))
    } else {
        None
    };
    let actor = match gate(state, &cmd.name) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };

    let (owner_id, title, max_score) = match state.store.assignment(assignment_id) {
        Ok(a) => (a.teacher_id, a.title.clone(), a.max_score),
        Err(e) => return CommandError::from(e).response(),
    };
    if owner_id != actor.id {
        return CommandError::forbidden("you may only grade your own assignments").response();
    }
    let Some(student) = state.store.user_by_email(&student_email).cloned() else {
        return CommandError::not_found("user", &student_email).response();
    };
    let Some(submission_id) = state
        .store
        .submission_for(assignment_id, student.id)
        .map(|s| s.id)
    else {
        return CommandError::with_details(
            ErrorKind::NotFound,
            format!(
                "no submission for assignment {} by {}",
                assignment_id, student_email
            ),
            json!({
                "entity": "submission",
                "assignmentId": assignment_id,
                "studentEmail": student_email,
            }),
        )
        .response();
    };
    let grade_id = match state.store.create_grade(NewGrade {
        submission_id,
        score,
        comments,
        graded_by: actor.id,
        graded_at: Utc::now(),
    }) {
        Ok(v) => v,
        Err(e) => return CommandError::from(e).response(),
    };

    let percentage = grading::percentage(score, max_score);
    let letter = grading::letter_for(percentage);
    if let Err(e) = state.store.push_notification(
        student.id,
        format!(
            "You received {}/{} ({:.1}%, {}) on {}",
            score, max_score, percentage, letter, title
        ),
    ) {
        return CommandError::from(e).response();
    }
    let parent_ids: Vec<u64> = state
        .store
        .users()
        .filter(|u| u.parent_of.contains(&student.id))
        .map(|u| u.id)
        .collect();
    for parent_id in parent_ids {
        if let Err(e) = state.store.push_notification(
            parent_id,
            format!(
                "{} received {}/{} ({:.1}%, {}) on {}",
                student.full_name, score, max_score, percentage, letter, title
            ),
        ) {
            return CommandError::from(e).response();
        }
    }
    ok(json!({
        "gradeId": grade_id,
        "submissionId": submission_id,
        "assignmentId": assignment_id,
        "studentId": student.id,
        "score": score,
        "maxScore": max_score,
        "percentage": percentage,
        "letter": letter,
    }))
}

fn grade_row(store: &Store, grade: &Grade) -> Option<Value> {
    let submission = store.submission(grade.submission_id).ok()?;
    let assignment = store.assignment(submission.assignment_id).ok()?;
    let student = store.user(submission.student_id).ok()?;
    let grader = store.user(grade.graded_by).ok()?;
    let percentage = grading::percentage(grade.score, assignment.max_score);
    Some(json!({
        "gradeId": grade.id,
        "assignmentId": assignment.id,
        "assignmentTitle": assignment.title,
        "student": student.full_name,
        "studentEmail": student.email,
        "score": grade.score,
        "maxScore": assignment.max_score,
        "percentage": percentage,
        "letter": grading::letter_for(percentage),
        "comments": grade.comments,
        "gradedBy": grader.full_name,
        "gradedAt": fmt_ts(grade.graded_at),
    }))
}

/// Students see grades on their own work, parents their children's,
/// teachers the grades they issued. Admins use exports instead.
fn handle_view_grades(state: &mut AppState, cmd: &Command) -> Value {
    let actor = match gate(state, &cmd.name) {
        Ok(v) => v,
        Err(e) => return e.response(),
    };
    let store = &state.store;
    let rows: Vec<Value> = store
        .grades()
        .filter(|g| match actor.role {
            Role::Teacher => g.graded_by == actor.id,
            Role::Student => store
                .submission(g.submission_id)
                .map(|s| s.student_id == actor.id)
                .unwrap_or(false),
            Role::Parent => store
                .submission(g.submission_id)
                .map(|s| actor.parent_of.contains(&s.student_id))
                .unwrap_or(false),
            Role::Admin => false,
        })
        .filter_map(|g| grade_row(store, g))
        .collect();
    ok(json!({ "count": rows.len(), "grades": rows }))
}
