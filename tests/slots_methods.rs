mod test_support;

use serde_json::json;
use test_support::{open_workspace, request_err, request_ok, spawn_sidecar};

#[test]
fn health_reports_the_loaded_slot_table() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["slotCount"], 94);
    assert!(health["workspacePath"].is_null());

    let list = request_ok(&mut stdin, &mut reader, "2", "slots.list", json!({}));
    let codes = list["codes"].as_array().expect("codes");
    assert_eq!(codes.len(), 94);
    assert_eq!(codes[0], "A1");
    assert_eq!(codes.last().and_then(|v| v.as_str()), Some("L60"));
}

#[test]
fn occurrences_cover_theory_and_generated_labs() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let a1 = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "slots.occurrences",
        json!({ "code": "a1" }),
    );
    assert_eq!(a1["code"], "A1");
    assert_eq!(
        a1["occurrences"],
        json!([
            { "day": "Mon", "start": "08:00", "end": "08:50" },
            { "day": "Wed", "start": "09:00", "end": "09:50" }
        ])
    );

    let l31 = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "slots.occurrences",
        json!({ "code": "L31" }),
    );
    assert_eq!(
        l31["occurrences"],
        json!([{ "day": "Mon", "start": "14:00", "end": "14:50" }])
    );

    let l61 = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "slots.occurrences",
        json!({ "code": "L61" }),
    );
    assert_eq!(l61["occurrences"], json!([]));
}

#[test]
fn grid_exposes_periods_and_lunch_breaks() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let grid = request_ok(&mut stdin, &mut reader, "1", "slots.grid", json!({}));
    assert_eq!(grid["theory"].as_array().map(Vec::len), Some(10));
    assert_eq!(grid["lab"].as_array().map(Vec::len), Some(12));
    assert_eq!(grid["lab"][0], json!({ "start": "08:00", "end": "08:50" }));
    assert_eq!(grid["labLunch"], json!({ "start": "13:20", "end": "14:00" }));
    assert_eq!(grid["theoryLunch"]["end"], "14:00");
}

#[test]
fn eligible_offers_depend_on_type_and_credits() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let four = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "slots.eligible",
        json!({ "type": "Theory", "credits": 4 }),
    );
    assert_eq!(
        four["slots"],
        json!([
            "A1+TA1+TAA1",
            "C1+TC1+TCC1",
            "A2+TA2+TAA2",
            "B2+TB2+TBB2",
            "C2+TC2+TCC2",
            "D2+TD2+TDD2"
        ])
    );

    let three = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "slots.eligible",
        json!({ "type": "theory", "credits": 3 }),
    );
    assert_eq!(three["slots"].as_array().map(Vec::len), Some(14));
    assert_eq!(three["slots"][0], "A1+TA1");

    let labs = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "slots.eligible",
        json!({ "type": "Lab" }),
    );
    assert_eq!(labs["slots"].as_array().map(Vec::len), Some(30));

    let project = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "slots.eligible",
        json!({ "type": "Project", "credits": 3 }),
    );
    assert_eq!(project["slots"], json!([]));

    let bad = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "slots.eligible",
        json!({ "type": "Seminar" }),
    );
    assert_eq!(bad["code"], "bad_params");
}

#[test]
fn validate_and_resolve_handle_unknown_tokens() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let valid = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "slots.validate",
        json!({ "slot": "L1+L2" }),
    );
    assert_eq!(valid["valid"], true);
    assert_eq!(valid["unknown"], json!([]));

    let invalid = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "slots.validate",
        json!({ "slot": "a1+xyz" }),
    );
    assert_eq!(invalid["slot"], "A1+XYZ");
    assert_eq!(invalid["valid"], false);
    assert_eq!(invalid["unknown"], json!(["XYZ"]));

    let empty = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "slots.validate",
        json!({ "slot": "" }),
    );
    assert_eq!(empty["valid"], false);

    let lenient = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "slots.resolve",
        json!({ "slot": "A1+XYZ", "course": { "code": "CSE101", "name": "Data Structures" } }),
    );
    let sessions = lenient["sessions"].as_array().expect("sessions");
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["id"], "CSE101-A1-Mon-08:00");
    assert_eq!(sessions[0]["venue"], "TBD");
    assert_eq!(sessions[0]["type"], "Theory");

    let strict = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "slots.resolve",
        json!({ "slot": "A1+XYZ", "strict": true, "course": { "code": "CSE101" } }),
    );
    assert_eq!(strict["code"], "unknown_slot");
    assert_eq!(strict["details"]["unknown"], json!(["XYZ"]));

    let bad_flag = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "slots.resolve",
        json!({ "slot": "A1", "strict": "yes", "course": { "code": "CSE101" } }),
    );
    assert_eq!(bad_flag["code"], "bad_params");
}

#[test]
fn clash_check_reports_the_first_conflict() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let no_ws = request_err(
        &mut stdin,
        &mut reader,
        "0",
        "slots.clash",
        json!({ "regNumber": "21BCE0001", "slot": "A1" }),
    );
    assert_eq!(no_ws["code"], "no_workspace");

    let _ = open_workspace(&mut stdin, &mut reader, "slotd-slots-clash");
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "courses.create",
        json!({
            "regNumber": "21BCE0001",
            "course": {
                "code": "CSE101",
                "name": "Data Structures",
                "type": "Theory",
                "slot": "A1+TA1"
            }
        }),
    );
    let course_id = created["course"]["id"].as_str().expect("id").to_string();

    let free = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "slots.clash",
        json!({ "regNumber": "21BCE0001", "slot": "F1" }),
    );
    assert!(free["conflict"].is_null());
    assert!(free.get("conflicts").is_none());

    let taken = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "slots.clash",
        json!({ "regNumber": "21BCE0001", "slot": "a1" }),
    );
    assert_eq!(taken["conflict"], "Data Structures");

    let own = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "slots.clash",
        json!({ "regNumber": "21BCE0001", "slot": "A1", "excludeCourseId": course_id }),
    );
    assert!(own["conflict"].is_null());
}
