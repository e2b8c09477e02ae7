mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, stage_names, temp_dir};

#[test]
fn new_form_edit_stages_validate_save_and_reopen() {
    let workspace = temp_dir("lessonly-forms");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created = request_ok(&mut stdin, &mut reader, "2", "forms.new", json!({ "mode": "teacher" }));
    let form = created.get("form").cloned().expect("form");
    let form_id = form
        .get("formId")
        .and_then(|v| v.as_str())
        .expect("formId")
        .to_string();
    assert_eq!(form.get("phase").and_then(|v| v.as_str()), Some("ready"));
    assert_eq!(form.get("isNew").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(stage_names(&form), vec!["Starter", "Plenary"]);

    // Saving an empty form reports every required field.
    let e = request_err(&mut stdin, &mut reader, "3", "forms.save", json!({ "formId": form_id }));
    assert_eq!(e.get("code").and_then(|v| v.as_str()), Some("validation_failed"));
    assert_eq!(e.pointer("/details/scrollToTop").and_then(|v| v.as_bool()), Some(true));
    let errors = e.pointer("/details/errors").and_then(|v| v.as_object()).expect("errors");
    for key in ["topic", "subject", "yearGroup", "date", "time", "objectives"] {
        assert!(errors.contains_key(key), "missing {}", key);
    }
    let got = request_ok(&mut stdin, &mut reader, "4", "forms.get", json!({ "formId": form_id }));
    assert_eq!(got.pointer("/form/phase").and_then(|v| v.as_str()), Some("invalid"));

    let fields = [
        ("topic", "the lord of the flies"),
        ("subject", "english"),
        ("yearGroup", "Year 10"),
        ("date", "2026-03-02"),
        ("time", "09:00"),
        ("objectives", "explore themes"),
    ];
    for (i, (field, value)) in fields.iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("f{}", i),
            "forms.setField",
            json!({ "formId": form_id, "field": field, "value": value }),
        );
    }

    // Year 10 needs an exam board.
    let e = request_err(&mut stdin, &mut reader, "5", "forms.validate", json!({ "formId": form_id }));
    let errors = e.pointer("/details/errors").and_then(|v| v.as_object()).expect("errors");
    assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["examBoard"]);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "forms.setField",
        json!({ "formId": form_id, "field": "examBoard", "value": "aqa" }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "7", "forms.validate", json!({ "formId": form_id }));

    // Stage editing.
    for i in 0..3 {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "forms.stages.add",
            json!({ "formId": form_id }),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "forms.stages.setField",
        json!({ "formId": form_id, "index": 2, "field": "teachingNote", "value": "Model an answer" }),
    );
    let after_remove = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "forms.stages.remove",
        json!({ "formId": form_id, "index": 1 }),
    );
    let form = after_remove.get("form").cloned().expect("form");
    assert_eq!(stage_names(&form), vec!["Starter", "Stage 1", "Stage 2", "Plenary"]);
    assert_eq!(
        form.pointer("/record/lessonStructure/1/teachingNote").and_then(|v| v.as_str()),
        Some("Model an answer")
    );

    let unchanged = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "forms.stages.remove",
        json!({ "formId": form_id, "index": 0 }),
    );
    assert_eq!(stage_names(&unchanged["form"]), stage_names(&form));

    let e = request_err(
        &mut stdin,
        &mut reader,
        "11",
        "forms.stages.clear",
        json!({ "formId": form_id, "index": 42 }),
    );
    assert_eq!(e.get("code").and_then(|v| v.as_str()), Some("bad_stage_index"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "forms.resources.set",
        json!({ "formId": form_id, "resources": [{ "title": "Text extract", "url": "https://example.org/extract" }] }),
    );

    let saved = request_ok(&mut stdin, &mut reader, "13", "forms.save", json!({ "formId": form_id }));
    let form = saved.get("form").cloned().expect("form");
    assert_eq!(form.get("phase").and_then(|v| v.as_str()), Some("saved"));
    assert_eq!(form.get("isNew").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        form.pointer("/record/topic").and_then(|v| v.as_str()),
        Some("The Lord of the Flies")
    );
    assert_eq!(
        form.pointer("/record/objectives").and_then(|v| v.as_str()),
        Some("• Explore themes")
    );
    assert_eq!(form.pointer("/record/examBoard").and_then(|v| v.as_str()), Some("Aqa"));
    let lesson_id = form
        .pointer("/record/id")
        .and_then(|v| v.as_str())
        .expect("lesson id")
        .to_string();

    let listed = request_ok(&mut stdin, &mut reader, "14", "lessons.list", json!({}));
    let lessons = listed.get("lessons").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons[0].get("id").and_then(|v| v.as_str()), Some(lesson_id.as_str()));
    assert_eq!(lessons[0].get("date").and_then(|v| v.as_str()), Some("2026-03-02"));

    let reopened = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "forms.edit",
        json!({ "lessonId": lesson_id }),
    );
    let edit_id = reopened
        .pointer("/form/formId")
        .and_then(|v| v.as_str())
        .expect("formId")
        .to_string();
    assert_eq!(stage_names(&reopened["form"]), vec!["Starter", "Stage 1", "Stage 2", "Plenary"]);
    assert_eq!(
        reopened.pointer("/form/record/resources/0/title").and_then(|v| v.as_str()),
        Some("Text extract")
    );

    // Edits are not re-capitalized by default.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "forms.setField",
        json!({ "formId": edit_id, "field": "notes", "value": "bring spare copies" }),
    );
    let saved = request_ok(&mut stdin, &mut reader, "17", "forms.save", json!({ "formId": edit_id }));
    assert_eq!(
        saved.pointer("/form/record/notes").and_then(|v| v.as_str()),
        Some("bring spare copies")
    );
    assert_eq!(
        request_ok(&mut stdin, &mut reader, "18", "lessons.list", json!({}))
            .get("lessons")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );

    let _ = request_ok(&mut stdin, &mut reader, "19", "forms.close", json!({ "formId": edit_id }));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "20",
        "lessons.delete",
        json!({ "lessonId": lesson_id }),
    );
    let e = request_err(
        &mut stdin,
        &mut reader,
        "21",
        "lessons.open",
        json!({ "lessonId": lesson_id }),
    );
    assert_eq!(e.get("code").and_then(|v| v.as_str()), Some("not_found"));
}

#[test]
fn mode_variants_differ_in_stage_rules() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let ext = request_ok(&mut stdin, &mut reader, "1", "forms.new", json!({ "mode": "teacherExtended" }));
    let ext_id = ext.pointer("/form/formId").and_then(|v| v.as_str()).expect("id").to_string();
    let _ = request_ok(&mut stdin, &mut reader, "2", "forms.stages.add", json!({ "formId": ext_id }));
    let renamed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "forms.stages.rename",
        json!({ "formId": ext_id, "index": 1, "name": "STAGE   3" }),
    );
    assert_eq!(stage_names(&renamed["form"]), vec!["Starter", "Stage 3", "Plenary"]);

    let tutor = request_ok(&mut stdin, &mut reader, "4", "forms.new", json!({ "mode": "tutor" }));
    let tutor_id = tutor.pointer("/form/formId").and_then(|v| v.as_str()).expect("id").to_string();
    let _ = request_ok(&mut stdin, &mut reader, "5", "forms.stages.add", json!({ "formId": tutor_id }));
    let _ = request_ok(&mut stdin, &mut reader, "6", "forms.stages.add", json!({ "formId": tutor_id }));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "forms.stages.rename",
        json!({ "formId": tutor_id, "index": 2, "name": "stage two, exam practice" }),
    );
    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "forms.stages.remove",
        json!({ "formId": tutor_id, "index": 1 }),
    );
    assert_eq!(
        stage_names(&removed["form"]),
        vec!["Starter", "stage two, exam practice", "Plenary"]
    );

    // Anchors keep their names; clear wipes only the notes.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "forms.stages.setField",
        json!({ "formId": tutor_id, "index": 0, "field": "duration", "value": "5 min" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "forms.stages.rename",
        json!({ "formId": tutor_id, "index": 0, "name": "Warm up" }),
    );
    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "forms.stages.clear",
        json!({ "formId": tutor_id, "index": 0 }),
    );
    assert_eq!(
        cleared.pointer("/form/record/lessonStructure/0"),
        Some(&json!({
            "name": "Starter",
            "duration": "",
            "teachingNote": "",
            "learningNote": "",
            "assessingNote": "",
            "adaptingNote": ""
        }))
    );

    let student = request_ok(&mut stdin, &mut reader, "12", "forms.new", json!({ "mode": "student" }));
    let student_id = student.pointer("/form/formId").and_then(|v| v.as_str()).expect("id").to_string();
    let e = request_err(
        &mut stdin,
        &mut reader,
        "13",
        "forms.setField",
        json!({ "formId": student_id, "field": "studentName", "value": "Sam" }),
    );
    assert_eq!(e.get("code").and_then(|v| v.as_str()), Some("bad_params"));
}
