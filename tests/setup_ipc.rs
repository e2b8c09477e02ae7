mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, spawn_sidecar_with_env, temp_dir};

#[test]
fn setup_sections_default_update_and_persist() {
    let workspace = temp_dir("lessonly-setup");
    let path = workspace.to_string_lossy().to_string();

    {
        let (_child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(&mut stdin, &mut reader, "1", "workspace.select", json!({ "path": path }));

        let setup = request_ok(&mut stdin, &mut reader, "2", "setup.get", json!({}));
        assert_eq!(setup.pointer("/app/mode").and_then(|v| v.as_str()), Some("teacher"));
        assert_eq!(setup.pointer("/app/ownerId").and_then(|v| v.as_str()), Some("local"));
        assert!(setup.pointer("/generation/endpoint").map(|v| v.is_null()).unwrap_or(false));
        assert_eq!(
            setup.pointer("/forms/capitalizeOnEdit").and_then(|v| v.as_bool()),
            Some(false)
        );

        let e = request_err(
            &mut stdin,
            &mut reader,
            "3",
            "setup.update",
            json!({ "section": "app", "patch": { "mode": "admin" } }),
        );
        assert_eq!(e.get("code").and_then(|v| v.as_str()), Some("bad_params"));
        let e = request_err(
            &mut stdin,
            &mut reader,
            "4",
            "setup.update",
            json!({ "section": "forms", "patch": { "colour": "blue" } }),
        );
        assert_eq!(e.get("code").and_then(|v| v.as_str()), Some("bad_params"));

        let app = request_ok(
            &mut stdin,
            &mut reader,
            "5",
            "setup.update",
            json!({ "section": "app", "patch": { "mode": "tutor" } }),
        );
        assert_eq!(app.get("mode").and_then(|v| v.as_str()), Some("tutor"));
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "6",
            "setup.update",
            json!({ "section": "forms", "patch": { "capitalizeOnEdit": true } }),
        );

        let health = request_ok(&mut stdin, &mut reader, "7", "health", json!({}));
        assert_eq!(health.get("mode").and_then(|v| v.as_str()), Some("tutor"));

        // New forms default to the configured mode.
        let created = request_ok(&mut stdin, &mut reader, "8", "forms.new", json!({}));
        assert_eq!(created.pointer("/form/mode").and_then(|v| v.as_str()), Some("tutor"));
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(&mut stdin, &mut reader, "1", "workspace.select", json!({ "path": path }));
    assert_eq!(selected.get("mode").and_then(|v| v.as_str()), Some("tutor"));
    let setup = request_ok(&mut stdin, &mut reader, "2", "setup.get", json!({}));
    assert_eq!(
        setup.pointer("/forms/capitalizeOnEdit").and_then(|v| v.as_bool()),
        Some(true)
    );
}

#[test]
fn environment_overrides_saved_mode() {
    let workspace = temp_dir("lessonly-setup-env");
    let (_child, mut stdin, mut reader) =
        spawn_sidecar_with_env(&[("LESSONLY_MODE", "student")]);
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected.get("mode").and_then(|v| v.as_str()), Some("student"));

    // Saved sections still report what is stored.
    let setup = request_ok(&mut stdin, &mut reader, "2", "setup.get", json!({}));
    assert_eq!(setup.pointer("/app/mode").and_then(|v| v.as_str()), Some("teacher"));
}
