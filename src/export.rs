use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params_from_iter, Connection};
use serde_json::{json, Map, Value};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::policy::Role;
use crate::store::{Store, User};

/// Canonical table sequence. Every snapshot carries all five tables in
/// this order, empty or not, so the four encodings stay structurally
/// aligned.
const USERS_COLUMNS: &[&str] = &[
    "id",
    "role",
    "full_name",
    "email",
    "phone",
    "address",
    "parent_of",
    "created_at",
];
const ASSIGNMENTS_COLUMNS: &[&str] = &[
    "id",
    "teacher_id",
    "title",
    "description",
    "due_date",
    "max_score",
    "class_id",
];
const SUBMISSIONS_COLUMNS: &[&str] = &[
    "id",
    "assignment_id",
    "student_id",
    "text",
    "submitted_at",
    "is_late",
];
const GRADES_COLUMNS: &[&str] = &[
    "id",
    "submission_id",
    "score",
    "comments",
    "graded_by",
    "graded_at",
];
const NOTIFICATIONS_COLUMNS: &[&str] = &["id", "recipient_id", "message", "read", "created_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Sqlite,
    Json,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<ExportFormat> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Xlsx),
            "sqlite" => Some(ExportFormat::Sqlite),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Sqlite => "sqlite",
            ExportFormat::Json => "json",
        }
    }
}

/// What slice of the store an export covers. Authorization for a scope is
/// the caller's job; projection only filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Own,
    Class(String),
    School,
}

impl Scope {
    pub fn tag(&self, actor: &User) -> String {
        match self {
            Scope::Own => format!("user_{}", actor.id),
            Scope::Class(class_id) => format!("class_{}", class_id),
            Scope::School => "school".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone)]
pub struct TableData {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<Cell>>,
}

/// Format-independent intermediate: the five tables, fixed column order,
/// rows in store insertion order. Serializing the same snapshot twice
/// yields byte-identical CSV and JSON.
#[derive(Debug, Clone)]
pub struct TabularSnapshot {
    pub tables: Vec<TableData>,
}

impl TabularSnapshot {
    pub fn table(&self, name: &str) -> Option<&TableData> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn row_counts(&self) -> Vec<(&'static str, usize)> {
        self.tables.iter().map(|t| (t.name, t.rows.len())).collect()
    }
}

#[derive(Default)]
struct ScopeIds {
    users: BTreeSet<u64>,
    assignments: BTreeSet<u64>,
    submissions: BTreeSet<u64>,
    grades: BTreeSet<u64>,
    notifications: BTreeSet<u64>,
}

fn collect_own(store: &Store, actor: &User, ids: &mut ScopeIds) {
    ids.users.insert(actor.id);
    for n in store.notifications_for(actor.id) {
        ids.notifications.insert(n.id);
    }
    match actor.role {
        Role::Student => collect_student_work(store, actor.id, ids),
        Role::Teacher => {
            for a in store.assignments_by_teacher(actor.id) {
                ids.assignments.insert(a.id);
                for s in store.submissions_for_assignment(a.id) {
                    ids.submissions.insert(s.id);
                    if let Some(g) = store.grade_for_submission(s.id) {
                        ids.grades.insert(g.id);
                    }
                }
            }
        }
        Role::Parent => {
            for child_id in &actor.parent_of {
                ids.users.insert(*child_id);
                collect_student_work(store, *child_id, ids);
            }
        }
        Role::Admin => {}
    }
}

fn collect_student_work(store: &Store, student_id: u64, ids: &mut ScopeIds) {
    for s in store.submissions_by_student(student_id) {
        ids.submissions.insert(s.id);
        ids.assignments.insert(s.assignment_id);
        if let Some(g) = store.grade_for_submission(s.id) {
            ids.grades.insert(g.id);
        }
    }
}

fn collect_class(store: &Store, class_id: &str, ids: &mut ScopeIds) {
    for a in store.assignments_in_class(class_id) {
        ids.assignments.insert(a.id);
        ids.users.insert(a.teacher_id);
        for s in store.submissions_for_assignment(a.id) {
            ids.submissions.insert(s.id);
            ids.users.insert(s.student_id);
            if let Some(g) = store.grade_for_submission(s.id) {
                ids.grades.insert(g.id);
            }
        }
    }
}

fn collect_school(store: &Store, ids: &mut ScopeIds) {
    for u in store.users() {
        ids.users.insert(u.id);
    }
    for a in store.assignments() {
        ids.assignments.insert(a.id);
    }
    for s in store.submissions() {
        ids.submissions.insert(s.id);
    }
    for g in store.grades() {
        ids.grades.insert(g.id);
    }
    for n in store.notifications() {
        ids.notifications.insert(n.id);
    }
}

/// Projects the scoped slice of the store into the snapshot form. The
/// caller has already authorized the scope for this actor.
pub fn project(store: &Store, scope: &Scope, actor: &User) -> TabularSnapshot {
    let mut ids = ScopeIds::default();
    match scope {
        Scope::Own => collect_own(store, actor, &mut ids),
        Scope::Class(class_id) => collect_class(store, class_id, &mut ids),
        Scope::School => collect_school(store, &mut ids),
    }

    let users_rows: Vec<Vec<Cell>> = store
        .users()
        .filter(|u| ids.users.contains(&u.id))
        .map(|u| {
            vec![
                Cell::Int(u.id as i64),
                Cell::Text(u.role.as_str().to_string()),
                Cell::Text(u.full_name.clone()),
                Cell::Text(u.email.clone()),
                opt_text(&u.phone),
                opt_text(&u.address),
                Cell::Text(join_ids(&u.parent_of)),
                Cell::Text(fmt_ts(u.created_at)),
            ]
        })
        .collect();

    let assignments_rows: Vec<Vec<Cell>> = store
        .assignments()
        .filter(|a| ids.assignments.contains(&a.id))
        .map(|a| {
            vec![
                Cell::Int(a.id as i64),
                Cell::Int(a.teacher_id as i64),
                Cell::Text(a.title.clone()),
                Cell::Text(a.description.clone()),
                Cell::Text(a.due_date.to_string()),
                Cell::Real(a.max_score),
                Cell::Text(a.class_id.clone()),
            ]
        })
        .collect();

    let submissions_rows: Vec<Vec<Cell>> = store
        .submissions()
        .filter(|s| ids.submissions.contains(&s.id))
        .map(|s| {
            vec![
                Cell::Int(s.id as i64),
                Cell::Int(s.assignment_id as i64),
                Cell::Int(s.student_id as i64),
                Cell::Text(s.text.clone()),
                Cell::Text(fmt_ts(s.submitted_at)),
                Cell::Bool(s.is_late),
            ]
        })
        .collect();

    let grades_rows: Vec<Vec<Cell>> = store
        .grades()
        .filter(|g| ids.grades.contains(&g.id))
        .map(|g| {
            vec![
                Cell::Int(g.id as i64),
                Cell::Int(g.submission_id as i64),
                Cell::Real(g.score),
                opt_text(&g.comments),
                Cell::Int(g.graded_by as i64),
                Cell::Text(fmt_ts(g.graded_at)),
            ]
        })
        .collect();

    let notifications_rows: Vec<Vec<Cell>> = store
        .notifications()
        .filter(|n| ids.notifications.contains(&n.id))
        .map(|n| {
            vec![
                Cell::Int(n.id as i64),
                Cell::Int(n.recipient_id as i64),
                Cell::Text(n.message.clone()),
                Cell::Bool(n.read),
                Cell::Text(fmt_ts(n.created_at)),
            ]
        })
        .collect();

    TabularSnapshot {
        tables: vec![
            TableData {
                name: "users",
                columns: USERS_COLUMNS,
                rows: users_rows,
            },
            TableData {
                name: "assignments",
                columns: ASSIGNMENTS_COLUMNS,
                rows: assignments_rows,
            },
            TableData {
                name: "submissions",
                columns: SUBMISSIONS_COLUMNS,
                rows: submissions_rows,
            },
            TableData {
                name: "grades",
                columns: GRADES_COLUMNS,
                rows: grades_rows,
            },
            TableData {
                name: "notifications",
                columns: NOTIFICATIONS_COLUMNS,
                rows: notifications_rows,
            },
        ],
    }
}

pub fn fmt_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn opt_text(v: &Option<String>) -> Cell {
    match v {
        Some(s) => Cell::Text(s.clone()),
        None => Cell::Null,
    }
}

fn join_ids(ids: &BTreeSet<u64>) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Int(i) => i.to_string(),
        Cell::Real(f) => format!("{}", f),
        Cell::Text(s) => s.clone(),
        Cell::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Cell::Null => String::new(),
    }
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// One CSV document per table: header row, then data rows.
pub fn to_csv_tables(snapshot: &TabularSnapshot) -> Vec<(&'static str, String)> {
    snapshot
        .tables
        .iter()
        .map(|table| {
            let mut csv = String::new();
            csv.push_str(&table.columns.join(","));
            csv.push('\n');
            for row in &table.rows {
                let line: Vec<String> = row
                    .iter()
                    .map(|cell| csv_quote(&render_cell(cell)))
                    .collect();
                csv.push_str(&line.join(","));
                csv.push('\n');
            }
            (table.name, csv)
        })
        .collect()
}

fn json_cell(cell: &Cell) -> Value {
    match cell {
        Cell::Int(i) => json!(i),
        Cell::Real(f) => json!(f),
        Cell::Text(s) => json!(s),
        Cell::Bool(b) => json!(b),
        Cell::Null => Value::Null,
    }
}

/// Single object keyed by table name; each value is an array of row
/// objects keyed by column name.
pub fn to_json(snapshot: &TabularSnapshot) -> Value {
    let mut root = Map::new();
    for table in &snapshot.tables {
        let rows: Vec<Value> = table
            .rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (column, cell) in table.columns.iter().zip(row) {
                    obj.insert(column.to_string(), json_cell(cell));
                }
                Value::Object(obj)
            })
            .collect();
        root.insert(table.name.to_string(), Value::Array(rows));
    }
    Value::Object(root)
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn sheet_xml(table: &TableData) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
         <sheetData>",
    );
    let mut push_row = |row_no: usize, cells: &[String]| {
        xml.push_str(&format!("<row r=\"{}\">", row_no));
        for cell in cells {
            xml.push_str("<c t=\"inlineStr\"><is><t>");
            xml.push_str(&xml_escape(cell));
            xml.push_str("</t></is></c>");
        }
        xml.push_str("</row>");
    };
    let header: Vec<String> = table.columns.iter().map(|c| c.to_string()).collect();
    push_row(1, &header);
    for (i, row) in table.rows.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(render_cell).collect();
        push_row(i + 2, &cells);
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Minimal OOXML workbook: one worksheet per table, every cell an inline
/// string. No shared strings, no styles.
pub fn to_xlsx(snapshot: &TabularSnapshot) -> anyhow::Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut content_types = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
    );
    for i in 1..=snapshot.tables.len() {
        content_types.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
            i
        ));
    }
    content_types.push_str("</Types>");
    zip.start_file("[Content_Types].xml", opts)
        .context("failed to start content types entry")?;
    zip.write_all(content_types.as_bytes())
        .context("failed to write content types entry")?;

    zip.start_file("_rels/.rels", opts)
        .context("failed to start package relationships entry")?;
    zip.write_all(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
         </Relationships>"
            .as_bytes(),
    )
    .context("failed to write package relationships entry")?;

    let mut workbook = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"><sheets>",
    );
    let mut workbook_rels = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    );
    for (i, table) in snapshot.tables.iter().enumerate() {
        let sheet_no = i + 1;
        workbook.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            xml_escape(table.name),
            sheet_no,
            sheet_no
        ));
        workbook_rels.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{}.xml\"/>",
            sheet_no, sheet_no
        ));
    }
    workbook.push_str("</sheets></workbook>");
    workbook_rels.push_str("</Relationships>");

    zip.start_file("xl/workbook.xml", opts)
        .context("failed to start workbook entry")?;
    zip.write_all(workbook.as_bytes())
        .context("failed to write workbook entry")?;
    zip.start_file("xl/_rels/workbook.xml.rels", opts)
        .context("failed to start workbook relationships entry")?;
    zip.write_all(workbook_rels.as_bytes())
        .context("failed to write workbook relationships entry")?;

    for (i, table) in snapshot.tables.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), opts)
            .with_context(|| format!("failed to start worksheet entry for {}", table.name))?;
        zip.write_all(sheet_xml(table).as_bytes())
            .with_context(|| format!("failed to write worksheet entry for {}", table.name))?;
    }

    let cursor = zip.finish().context("failed to finalize workbook")?;
    Ok(cursor.into_inner())
}

fn sqlite_value(cell: &Cell) -> rusqlite::types::Value {
    use rusqlite::types::Value as SqlValue;
    match cell {
        Cell::Int(i) => SqlValue::Integer(*i),
        Cell::Real(f) => SqlValue::Real(*f),
        Cell::Text(s) => SqlValue::Text(s.clone()),
        Cell::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Cell::Null => SqlValue::Null,
    }
}

/// One table per entity kind, id as primary key, plain columns for the
/// foreign ids. No FK constraints; the snapshot is already consistent.
pub fn to_sqlite(snapshot: &TabularSnapshot, path: &Path) -> anyhow::Result<()> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to create database {}", path.to_string_lossy()))?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            role TEXT NOT NULL,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            address TEXT,
            parent_of TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS assignments (
            id INTEGER PRIMARY KEY,
            teacher_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            due_date TEXT NOT NULL,
            max_score REAL NOT NULL,
            class_id TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS submissions (
            id INTEGER PRIMARY KEY,
            assignment_id INTEGER NOT NULL,
            student_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            is_late INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS grades (
            id INTEGER PRIMARY KEY,
            submission_id INTEGER NOT NULL,
            score REAL NOT NULL,
            comments TEXT,
            graded_by INTEGER NOT NULL,
            graded_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY,
            recipient_id INTEGER NOT NULL,
            message TEXT NOT NULL,
            read INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );",
    )
    .context("failed to create export schema")?;

    for table in &snapshot.tables {
        let placeholders: Vec<&str> = table.columns.iter().map(|_| "?").collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name,
            table.columns.join(", "),
            placeholders.join(", ")
        );
        let mut stmt = stmt_context(conn.prepare(&sql), table.name)?;
        for row in &table.rows {
            let values: Vec<rusqlite::types::Value> = row.iter().map(sqlite_value).collect();
            stmt.execute(params_from_iter(values))
                .with_context(|| format!("failed to insert into {}", table.name))?;
        }
    }
    Ok(())
}

fn stmt_context<'a>(
    result: rusqlite::Result<rusqlite::Statement<'a>>,
    table: &str,
) -> anyhow::Result<rusqlite::Statement<'a>> {
    result.with_context(|| format!("failed to prepare insert for {}", table))
}

pub struct ArtifactSummary {
    pub base_name: String,
    pub files: Vec<PathBuf>,
    pub manifest_path: PathBuf,
}

/// Writes the chosen encoding plus a manifest into the output directory.
/// The base name carries the scope tag and a timestamp so repeated
/// exports never clobber each other.
pub fn write_artifacts(
    snapshot: &TabularSnapshot,
    format: ExportFormat,
    out_dir: &Path,
    scope_tag: &str,
) -> anyhow::Result<ArtifactSummary> {
    std::fs::create_dir_all(out_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            out_dir.to_string_lossy()
        )
    })?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let base_name = format!("{}_{}", scope_tag, timestamp);

    let mut files: Vec<PathBuf> = Vec::new();
    match format {
        ExportFormat::Csv => {
            for (name, csv) in to_csv_tables(snapshot) {
                let path = out_dir.join(format!("{}_{}.csv", base_name, name));
                write_text(&path, &csv)?;
                files.push(path);
            }
        }
        ExportFormat::Xlsx => {
            let path = out_dir.join(format!("{}.xlsx", base_name));
            let bytes = to_xlsx(snapshot)?;
            write_bytes(&path, &bytes)?;
            files.push(path);
        }
        ExportFormat::Sqlite => {
            let path = out_dir.join(format!("{}.sqlite3", base_name));
            to_sqlite(snapshot, &path)?;
            files.push(path);
        }
        ExportFormat::Json => {
            let path = out_dir.join(format!("{}.json", base_name));
            let text = serde_json::to_string_pretty(&to_json(snapshot))
                .context("failed to serialize json export")?;
            write_text(&path, &text)?;
            files.push(path);
        }
    }

    let mut tables = Map::new();
    for (name, count) in snapshot.row_counts() {
        tables.insert(name.to_string(), json!(count));
    }
    let manifest = json!({
        "export": {
            "scope": scope_tag,
            "format": format.as_str(),
            "timestamp": timestamp,
            "tables": Value::Object(tables),
            "files": files
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect::<Vec<_>>(),
        }
    });
    let manifest_path = out_dir.join(format!("{}_manifest.json", base_name));
    let manifest_text =
        serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
    write_text(&manifest_path, &manifest_text)?;

    Ok(ArtifactSummary {
        base_name,
        files,
        manifest_path,
    })
}

fn write_text(path: &Path, text: &str) -> anyhow::Result<()> {
    write_bytes(path, text.as_bytes())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let mut f = File::create(path)
        .with_context(|| format!("failed to create {}", path.to_string_lossy()))?;
    f.write_all(bytes)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))
}
