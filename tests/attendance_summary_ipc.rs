use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendd");
    let mut child = Command::new(exe)
        .env_remove("ATTENDD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(serde_json::Value::Null)
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn open_session(prefix: &str, roll_no: &str) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let workspace = temp_dir(prefix);
    let (child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "login",
        "students.login",
        json!({ "rollNo": roll_no }),
    );
    (child, stdin, reader)
}

fn summary(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    roll_no: &str,
) -> serde_json::Value {
    request_ok(stdin, reader, id, "attendance.summary", json!({ "rollNo": roll_no }))
}

#[test]
fn new_student_has_no_data() {
    let (mut child, mut stdin, mut reader) = open_session("attendd-summary-empty", "S1");
    let s = summary(&mut stdin, &mut reader, "1", "S1");
    assert_eq!(s["shortfall"]["status"], json!("no_data"));
    assert!(s["shortfall"].get("percent").is_none());
    assert!(s["shortfall"].get("classesNeeded").is_none());

    // A zero-class day still leaves nothing to evaluate.
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.submit",
        json!({ "rollNo": "S1", "date": "2024-01-01", "total": 0, "attended": 0 }),
    );
    let s = summary(&mut stdin, &mut reader, "3", "S1");
    assert_eq!(s["shortfall"]["status"], json!("no_data"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn shortage_reports_classes_needed() {
    let (mut child, mut stdin, mut reader) = open_session("attendd-summary-short", "S2");
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.submit",
        json!({ "rollNo": "S2", "date": "2024-01-01", "total": 20, "attended": 10 }),
    );
    let s = summary(&mut stdin, &mut reader, "2", "S2");
    let shortfall = &s["shortfall"];
    assert_eq!(shortfall["status"], json!("shortage"));
    assert_eq!(shortfall["percent"], json!(50.0));
    assert_eq!(shortfall["meetsThreshold"], json!(false));
    assert_eq!(shortfall["classesNeeded"], json!(21));
    assert_eq!(shortfall["gauge"], json!("red"));
    assert_eq!(shortfall["threshold"], json!(75));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn exactly_seventy_five_is_safe() {
    let (mut child, mut stdin, mut reader) = open_session("attendd-summary-safe", "S3");
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.submit",
        json!({ "rollNo": "S3", "date": "2024-01-01", "total": 4, "attended": 3 }),
    );
    let s = summary(&mut stdin, &mut reader, "2", "S3");
    let shortfall = &s["shortfall"];
    assert_eq!(shortfall["status"], json!("safe"));
    assert_eq!(shortfall["percent"], json!(75.0));
    assert_eq!(shortfall["meetsThreshold"], json!(true));
    assert!(shortfall["classesNeeded"].is_null());
    assert_eq!(shortfall["gauge"], json!("green"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn threshold_setting_drives_summary_and_rejects_hundred() {
    let (mut child, mut stdin, mut reader) = open_session("attendd-summary-threshold", "S4");
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.submit",
        json!({ "rollNo": "S4", "date": "2024-01-01", "total": 10, "attended": 6 }),
    );
    let current = request_ok(&mut stdin, &mut reader, "2", "settings.get", json!({}));
    assert_eq!(current["threshold"], json!(75));

    let rejected = request(
        &mut stdin,
        &mut reader,
        "3",
        "settings.update",
        json!({ "threshold": 100 }),
    );
    assert_eq!(error_code(&rejected), "invalid_configuration");

    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "settings.update",
        json!({ "threshold": 50 }),
    );
    let s = summary(&mut stdin, &mut reader, "5", "S4");
    assert_eq!(s["shortfall"]["status"], json!("safe"));
    assert_eq!(s["shortfall"]["threshold"], json!(50));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn summary_for_unknown_student_is_not_found() {
    let (mut child, mut stdin, mut reader) = open_session("attendd-summary-missing", "S5");
    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.summary",
        json!({ "rollNo": "S6" }),
    );
    assert_eq!(error_code(&resp), "not_found");

    drop(stdin);
    let _ = child.wait();
}
