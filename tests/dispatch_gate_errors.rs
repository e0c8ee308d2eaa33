
use test_support::{send_err, send_ok, spawn_cli};

#[test]
fn anonymous_callers_may_only_register_and_login() {
    let (_child, mut stdin, mut reader) = spawn_cli();

    for cmd in [
        "whoami",
        "logout",
        "list_users",
        "view_grades",
        "notifications",
        "export_my_data",
        "export_school",
    ] {
        send_err(&mut stdin, &mut reader, cmd, "Unauthenticated");
    }
}

#[test]
fn role_table_denials_are_forbidden_not_crashes() {
    let (_child, mut stdin, mut reader) = spawn_cli();

    send_ok(&mut stdin, &mut reader, "register student Sam s@x.com pw");
    for cmd in [
        "list_users",
        "delete_user s@x.com",
        "promote_user s@x.com admin",
        "link_parent p@x.com s@x.com",
        "create_assignment HW1 desc 2099-01-01 100",
        "grade_assignment 1 s@x.com 95",
        "export_class math101",
        "export_school",
    ] {
        send_err(&mut stdin, &mut reader, cmd, "Forbidden");
    }

    send_ok(&mut stdin, &mut reader, "register teacher Tina t@x.com pw");
    send_err(
        &mut stdin,
        &mut reader,
        "submit_assignment 1 work",
        "Forbidden",
    );
    send_err(&mut stdin, &mut reader, "export_school", "Forbidden");
}

#[test]
fn unknown_commands_are_usage_errors() {
    let (_child, mut stdin, mut reader) = spawn_cli();

    let error = send_err(&mut stdin, &mut reader, "drop_tables now", "UsageError");
    assert_eq!(error["details"]["command"], "drop_tables");
}

#[test]
fn malformed_arguments_fail_before_authentication() {
    let (_child, mut stdin, mut reader) = spawn_cli();

    // Still anonymous: arity and type problems surface as UsageError,
    // not Unauthenticated, because parsing runs first.
    send_err(&mut stdin, &mut reader, "delete_user", "UsageError");
    send_err(
        &mut stdin,
        &mut reader,
        "grade_assignment abc s@x.com 95",
        "UsageError",
    );
    send_err(
        &mut stdin,
        &mut reader,
        "submit_assignment one text",
        "UsageError",
    );
    send_err(
        &mut stdin,
        &mut reader,
        "create_assignment HW1 desc not-a-date 100",
        "UsageError",
    );
    send_err(
        &mut stdin,
        &mut reader,
        "create_assignment HW1 desc 2099-01-01 lots",
        "UsageError",
    );
    send_err(&mut stdin, &mut reader, "export_my_data pdf", "UsageError");
}

#[test]
fn failed_commands_leave_the_store_untouched() {
    let (_child, mut stdin, mut reader) = spawn_cli();

    send_ok(&mut stdin, &mut reader, "register admin Root root@x.com pw");
    send_err(&mut stdin, &mut reader, "register student", "UsageError");
    send_err(
        &mut stdin,
        &mut reader,
        "register parent Pat ROOT@X.COM pw",
        "ValidationError",
    );
    send_err(&mut stdin, &mut reader, "delete_user ghost@x.com", "NotFound");

    let users = send_ok(&mut stdin, &mut reader, "list_users");
    assert_eq!(users["count"], 1);
    assert_eq!(users["users"][0]["email"], "root@x.com");
}
