use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use crate::students::{self, StudentProfile};
use serde_json::{json, Map, Value};

fn validation_err(req: &Request, profile: &StudentProfile) -> Option<Value> {
    let errors = profile.validate();
    if errors.is_empty() {
        return None;
    }
    Some(err(
        &req.id,
        "validation_failed",
        "please fix the highlighted fields",
        Some(json!({ "errors": errors, "scrollToTop": true })),
    ))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match students::list(conn, &state.config.owner_id) {
        Ok(list) => ok(&req.id, json!({ "students": list })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_students_open(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match students::open(conn, &state.config.owner_id, &student_id) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(input) = req.params.get("input").filter(|v| v.is_object()) else {
        return err(&req.id, "bad_params", "missing input", None);
    };
    let mut profile: StudentProfile = match serde_json::from_value(input.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("input {}", e), None),
    };
    profile.id = None;
    if let Some(resp) = validation_err(req, &profile) {
        return resp;
    }
    profile.capitalize();
    match students::create(conn, &state.config.owner_id, &profile) {
        Ok(saved) => ok(&req.id, json!({ "studentId": saved.id, "student": saved })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn apply_patch(profile: &mut StudentProfile, patch: &Map<String, Value>) -> Result<(), String> {
    // Patch onto the serialized profile so field names and aliases match the
    // create path exactly.
    let mut current = serde_json::to_value(&*profile).map_err(|e| e.to_string())?;
    let Some(obj) = current.as_object_mut() else {
        return Err("profile must serialize to an object".into());
    };
    for (k, v) in patch {
        match k.as_str() {
            "id" | "createdAt" | "updatedAt" => {
                return Err(format!("patch.{} is read-only", k))
            }
            "name" | "yearGroup" | "examBoard" | "subjects" | "targetGrade" | "strengths"
            | "areasForDevelopment" | "notes" => {
                obj.insert(k.clone(), v.clone());
            }
            _ => return Err(format!("unknown patch field: {}", k)),
        }
    }
    *profile = serde_json::from_value(current).map_err(|e| format!("patch {}", e))?;
    Ok(())
}

fn handle_students_update(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch", None);
    };
    let owner_id = &state.config.owner_id;
    let mut profile = match students::open(conn, owner_id, &student_id) {
        Ok(p) => p,
        Err(e) => return err(&req.id, e.code(), e.to_string(), None),
    };
    if let Err(msg) = apply_patch(&mut profile, patch) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Some(resp) = validation_err(req, &profile) {
        return resp;
    }
    match students::update(conn, owner_id, &profile) {
        Ok(saved) => ok(&req.id, json!({ "student": saved })),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match students::delete(conn, &state.config.owner_id, &student_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.open" => Some(handle_students_open(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
