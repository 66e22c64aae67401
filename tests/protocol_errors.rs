mod test_support;

use serde_json::json;
use test_support::{request_err, send_line, spawn_sidecar, temp_dir};

#[test]
fn malformed_lines_get_bad_json_and_the_loop_keeps_going() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let resp = send_line(&mut stdin, &mut reader, "{not json");
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "bad_json");

    let resp = send_line(
        &mut stdin,
        &mut reader,
        &json!({ "id": "1", "method": "health", "params": {} }).to_string(),
    );
    assert_eq!(resp["ok"], true);
}

#[test]
fn unknown_methods_and_missing_workspace_are_reported() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let error = request_err(&mut stdin, &mut reader, "1", "grades.list", json!({}));
    assert_eq!(error["code"], "not_implemented");

    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "courses.list",
        json!({ "regNumber": "21BCE0001" }),
    );
    assert_eq!(error["code"], "no_workspace");

    let error = request_err(&mut stdin, &mut reader, "3", "workspace.select", json!({}));
    assert_eq!(error["code"], "bad_params");
}

#[test]
fn workspace_persists_across_restarts() {
    let workspace = temp_dir("slotd-persist");
    let params = json!({ "path": workspace.to_string_lossy() });
    let course = json!({
        "regNumber": "21BCE0001",
        "course": { "code": "CSE101", "name": "Data Structures", "type": "Theory", "slot": "C1" }
    });

    {
        let (_child, mut stdin, mut reader) = spawn_sidecar();
        let select = params.clone();
        let _ = test_support::request_ok(&mut stdin, &mut reader, "1", "workspace.select", select);
        let _ = test_support::request_ok(&mut stdin, &mut reader, "2", "courses.create", course);
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = test_support::request_ok(&mut stdin, &mut reader, "1", "workspace.select", params);
    let week = test_support::request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "timetable.get",
        json!({ "regNumber": "21BCE0001" }),
    );
    assert_eq!(week["sessionCount"], 2);
    assert_eq!(week["schedule"]["Wed"][0]["id"], "CSE101-C1-Wed-08:00");
}
