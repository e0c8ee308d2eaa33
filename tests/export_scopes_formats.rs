
use std::fs::File;

use test_support::{send_err, send_ok, spawn_cli, temp_dir};

fn seed_school(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
) {
    send_ok(stdin, reader, "register admin Root root@x.com pw");
    send_ok(stdin, reader, "register teacher Tina t@x.com pw");
    send_ok(
        stdin,
        reader,
        "create_assignment HW1 desc 2099-01-01 100 math101",
    );
    send_ok(stdin, reader, "register teacher Omar o@x.com pw");
    send_ok(
        stdin,
        reader,
        "create_assignment Essay prompt 2099-02-01 50 english9",
    );
    send_ok(stdin, reader, "register student Sam s@x.com pw");
    send_ok(stdin, reader, "submit_assignment 1 work");
    send_ok(stdin, reader, "register student Zoe z@x.com pw");
    send_ok(stdin, reader, "submit_assignment 2 essay");
    send_ok(stdin, reader, "login t@x.com pw");
    send_ok(stdin, reader, "grade_assignment 1 s@x.com 95");
}

#[test]
fn my_data_json_export_is_scoped_to_the_student() {
    let out_dir = temp_dir("gradebook-export-self");
    let (_child, mut stdin, mut reader) = spawn_cli();
    seed_school(&mut stdin, &mut reader);

    send_ok(&mut stdin, &mut reader, "login s@x.com pw");
    let export = send_ok(
        &mut stdin,
        &mut reader,
        &format!("export_my_data json {}", out_dir.to_string_lossy()),
    );
    assert_eq!(export["scope"], "user_4");
    assert_eq!(export["tables"]["users"], 1);
    assert_eq!(export["tables"]["assignments"], 1);
    assert_eq!(export["tables"]["submissions"], 1);
    assert_eq!(export["tables"]["grades"], 1);

    let path = export["files"][0].as_str().expect("json path");
    let data: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).expect("read json"))
            .expect("parse json");
    assert_eq!(data["users"].as_array().expect("users").len(), 1);
    assert_eq!(data["users"][0]["email"], "s@x.com");
    assert_eq!(data["submissions"][0]["text"], "work");
    assert_eq!(data["submissions"][0]["is_late"], false);
    assert_eq!(data["grades"][0]["score"], 95.0);
    assert_eq!(data["assignments"][0]["title"], "HW1");
    // Zoe's essay is not in Sam's export.
    assert!(data["submissions"].as_array().expect("rows").len() == 1);
}

#[test]
fn class_exports_require_ownership_or_admin() {
    let out_dir = temp_dir("gradebook-export-class");
    let (_child, mut stdin, mut reader) = spawn_cli();
    seed_school(&mut stdin, &mut reader);

    // Tina owns math101 but not english9.
    let export = send_ok(
        &mut stdin,
        &mut reader,
        &format!("export_class math101 json {}", out_dir.to_string_lossy()),
    );
    assert_eq!(export["scope"], "class_math101");
    assert_eq!(export["tables"]["assignments"], 1);
    assert_eq!(export["tables"]["submissions"], 1);
    // Only the teacher and the submitting student appear.
    assert_eq!(export["tables"]["users"], 2);
    assert_eq!(export["tables"]["notifications"], 0);

    send_err(
        &mut stdin,
        &mut reader,
        &format!("export_class english9 json {}", out_dir.to_string_lossy()),
        "Forbidden",
    );
    send_err(
        &mut stdin,
        &mut reader,
        &format!("export_class latin1 json {}", out_dir.to_string_lossy()),
        "NotFound",
    );

    // Admins may export any class.
    send_ok(&mut stdin, &mut reader, "login root@x.com pw");
    let admin_export = send_ok(
        &mut stdin,
        &mut reader,
        &format!("export_class english9 json {}", out_dir.to_string_lossy()),
    );
    assert_eq!(admin_export["tables"]["assignments"], 1);
}

#[test]
fn sqlite_export_writes_queryable_tables() {
    let out_dir = temp_dir("gradebook-export-sqlite");
    let (_child, mut stdin, mut reader) = spawn_cli();
    seed_school(&mut stdin, &mut reader);

    send_ok(&mut stdin, &mut reader, "login root@x.com pw");
    let export = send_ok(
        &mut stdin,
        &mut reader,
        &format!("export_school sqlite {}", out_dir.to_string_lossy()),
    );
    let path = export["files"][0].as_str().expect("sqlite path");
    assert!(path.ends_with(".sqlite3"));

    let conn = rusqlite::Connection::open(path).expect("open export db");
    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
        .expect("count users");
    assert_eq!(users, 5);
    let score: f64 = conn
        .query_row("SELECT score FROM grades WHERE id = 1", [], |r| r.get(0))
        .expect("grade score");
    assert_eq!(score, 95.0);
    let late: i64 = conn
        .query_row("SELECT is_late FROM submissions WHERE id = 1", [], |r| {
            r.get(0)
        })
        .expect("late flag");
    assert_eq!(late, 0);
    let email: String = conn
        .query_row("SELECT email FROM users WHERE id = 4", [], |r| r.get(0))
        .expect("student email");
    assert_eq!(email, "s@x.com");
}

#[test]
fn xlsx_export_has_one_sheet_per_table() {
    let out_dir = temp_dir("gradebook-export-xlsx");
    let (_child, mut stdin, mut reader) = spawn_cli();
    seed_school(&mut stdin, &mut reader);

    send_ok(&mut stdin, &mut reader, "login root@x.com pw");
    // xlsx is the default format.
    let export = send_ok(
        &mut stdin,
        &mut reader,
        &format!("export_school xlsx {}", out_dir.to_string_lossy()),
    );
    let path = export["files"][0].as_str().expect("xlsx path");
    assert!(path.ends_with(".xlsx"));

    let f = File::open(path).expect("open workbook");
    let mut archive = zip::ZipArchive::new(f).expect("read workbook zip");
    for name in [
        "[Content_Types].xml",
        "_rels/.rels",
        "xl/workbook.xml",
        "xl/_rels/workbook.xml.rels",
        "xl/worksheets/sheet1.xml",
        "xl/worksheets/sheet5.xml",
    ] {
        assert!(archive.by_name(name).is_ok(), "missing entry {}", name);
    }

    let mut workbook = String::new();
    std::io::Read::read_to_string(
        &mut archive.by_name("xl/workbook.xml").expect("workbook"),
        &mut workbook,
    )
    .expect("read workbook xml");
    for sheet in ["users", "assignments", "submissions", "grades", "notifications"] {
        assert!(workbook.contains(&format!("name=\"{}\"", sheet)));
    }

    let mut sheet1 = String::new();
    std::io::Read::read_to_string(
        &mut archive.by_name("xl/worksheets/sheet1.xml").expect("sheet1"),
        &mut sheet1,
    )
    .expect("read sheet xml");
    assert!(sheet1.contains("<t>full_name</t>"));
    assert!(sheet1.contains("<t>s@x.com</t>"));
}
