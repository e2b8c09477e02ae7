mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, spawn_sidecar_with_env, temp_dir};

#[test]
fn student_profiles_crud_with_exam_board_rule() {
    let workspace = temp_dir("lessonly-students");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let e = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "input": { "name": "  ", "yearGroup": "Year 12" } }),
    );
    assert_eq!(e.get("code").and_then(|v| v.as_str()), Some("validation_failed"));
    let errors = e.pointer("/details/errors").and_then(|v| v.as_object()).expect("errors");
    assert!(errors.contains_key("name"));
    assert!(errors.contains_key("examBoard"));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "input": {
            "name": "ada lovelace",
            "yearGroup": "Year 12",
            "examBoard": "ocr",
            "subjects": ["maths", " further maths"],
            "strengths": "quick with algebra"
        }}),
    );
    let student_id = created
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();
    let student = &created["student"];
    assert_eq!(student.get("name").and_then(|v| v.as_str()), Some("Ada Lovelace"));
    assert_eq!(student.get("examBoard").and_then(|v| v.as_str()), Some("Ocr"));
    assert_eq!(student.get("subjects"), Some(&json!(["Maths", "Further maths"])));
    assert_eq!(
        student.get("strengths").and_then(|v| v.as_str()),
        Some("Quick with algebra")
    );

    let e = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "students.update",
        json!({ "studentId": student_id, "patch": { "examBoard": "" } }),
    );
    assert_eq!(e.get("code").and_then(|v| v.as_str()), Some("validation_failed"));

    let e = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "students.update",
        json!({ "studentId": student_id, "patch": { "id": "other" } }),
    );
    assert_eq!(e.get("code").and_then(|v| v.as_str()), Some("bad_params"));

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.update",
        json!({ "studentId": student_id, "patch": { "yearGroup": "Year 9", "examBoard": null } }),
    );
    assert_eq!(
        updated.pointer("/student/yearGroup").and_then(|v| v.as_str()),
        Some("Year 9")
    );
    assert!(updated.pointer("/student/examBoard").map(|v| v.is_null()).unwrap_or(true));

    let listed = request_ok(&mut stdin, &mut reader, "7", "students.list", json!({}));
    assert_eq!(listed["students"].as_array().map(|a| a.len()), Some(1));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "students.delete",
        json!({ "studentId": student_id }),
    );
    let e = request_err(
        &mut stdin,
        &mut reader,
        "9",
        "students.open",
        json!({ "studentId": student_id }),
    );
    assert_eq!(e.get("code").and_then(|v| v.as_str()), Some("not_found"));
}

#[test]
fn students_are_scoped_to_the_owner() {
    let workspace = temp_dir("lessonly-students-owner");
    let path = workspace.to_string_lossy().to_string();

    let student_id = {
        let (_child, mut stdin, mut reader) =
            spawn_sidecar_with_env(&[("LESSONLY_OWNER_ID", "alice")]);
        let _ = request_ok(&mut stdin, &mut reader, "1", "workspace.select", json!({ "path": path }));
        let created = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "students.create",
            json!({ "input": { "name": "Sam", "yearGroup": "Year 7" } }),
        );
        created
            .get("studentId")
            .and_then(|v| v.as_str())
            .expect("studentId")
            .to_string()
    };

    let (_child, mut stdin, mut reader) = spawn_sidecar_with_env(&[("LESSONLY_OWNER_ID", "bob")]);
    let selected = request_ok(&mut stdin, &mut reader, "1", "workspace.select", json!({ "path": path }));
    assert_eq!(selected.get("ownerId").and_then(|v| v.as_str()), Some("bob"));
    let listed = request_ok(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(listed["students"].as_array().map(|a| a.len()), Some(0));
    let e = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "students.open",
        json!({ "studentId": student_id }),
    );
    assert_eq!(e.get("code").and_then(|v| v.as_str()), Some("not_found"));
}
