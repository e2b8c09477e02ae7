use crate::form::{FormError, LessonForm};
use crate::generate::{Generator, HttpGenerator};
use crate::ipc::error::{err, form_err, ok};
use crate::ipc::helpers::{db_conn, parse_opt_string, required_index, required_str, required_text};
use crate::ipc::types::{AppState, Request};
use crate::mode::Mode;
use crate::record::{LessonField, Resource};
use crate::stages::StageField;
use crate::store::SqliteLessonStore;
use serde_json::json;
use uuid::Uuid;

fn snapshot_json(form_id: &str, form: &LessonForm) -> serde_json::Value {
    let mut v = json!(form.snapshot());
    v["formId"] = json!(form_id);
    v
}

fn respond(req: &Request, form_id: &str, form: &LessonForm, result: Result<(), FormError>) -> serde_json::Value {
    match result {
        Ok(()) => ok(&req.id, json!({ "form": snapshot_json(form_id, form) })),
        Err(e) => form_err(&req.id, &e),
    }
}

/// Runs `op` against an open form and answers with the updated snapshot.
fn with_form(
    state: &mut AppState,
    req: &Request,
    op: impl FnOnce(&mut LessonForm) -> Result<(), FormError>,
) -> serde_json::Value {
    let form_id = match required_str(req, "formId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(form) = state.forms.get_mut(&form_id) else {
        return err(&req.id, "not_found", "form not found", None);
    };
    let result = op(form);
    respond(req, &form_id, form, result)
}

fn handle_forms_new(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mode = match parse_opt_string(req.params.get("mode")) {
        Ok(None) => state.config.mode,
        Ok(Some(s)) => match Mode::parse(&s) {
            Some(m) => m,
            None => return err(&req.id, "bad_params", format!("unknown mode: {}", s), None),
        },
        Err(m) => return err(&req.id, "bad_params", format!("mode {}", m), None),
    };
    let form_id = Uuid::new_v4().to_string();
    let form = LessonForm::new(&state.config, mode);
    let resp = ok(&req.id, json!({ "form": snapshot_json(&form_id, &form) }));
    state.forms.insert(form_id, form);
    resp
}

fn handle_forms_edit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let lesson_id = match required_str(req, "lessonId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = SqliteLessonStore::new(conn, &state.config.owner_id);
    let form = match LessonForm::edit(&state.config, &store, &lesson_id) {
        Ok(f) => f,
        Err(e) => return form_err(&req.id, &e),
    };
    let form_id = Uuid::new_v4().to_string();
    let resp = ok(&req.id, json!({ "form": snapshot_json(&form_id, &form) }));
    state.forms.insert(form_id, form);
    resp
}

fn handle_forms_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_form(state, req, |_| Ok(()))
}

fn handle_forms_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let form_id = match required_str(req, "formId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match state.forms.remove(&form_id) {
        Some(_) => ok(&req.id, json!({ "ok": true })),
        None => err(&req.id, "not_found", "form not found", None),
    }
}

fn handle_forms_set_field(state: &mut AppState, req: &Request) -> serde_json::Value {
    let field_raw = match required_str(req, "field") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(field) = LessonField::parse(&field_raw) else {
        return err(&req.id, "bad_params", format!("unknown field: {}", field_raw), None);
    };
    let value = match required_text(req, "value") {
        Ok(v) => v.to_string(),
        Err(e) => return e,
    };
    with_form(state, req, |form| form.set_field(field, &value))
}

fn handle_forms_resources_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("resources") else {
        return err(&req.id, "bad_params", "missing resources", None);
    };
    let resources: Vec<Resource> = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("resources must be an array of {{title, url}}: {}", e),
                None,
            )
        }
    };
    with_form(state, req, |form| form.set_resources(resources))
}

fn handle_stages_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_form(state, req, |form| form.add_stage().map(|_| ()))
}

fn handle_stages_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let index = match required_index(req, "index") {
        Ok(v) => v,
        Err(e) => return e,
    };
    with_form(state, req, |form| form.remove_stage(index))
}

fn handle_stages_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let index = match required_index(req, "index") {
        Ok(v) => v,
        Err(e) => return e,
    };
    with_form(state, req, |form| form.clear_stage(index))
}

fn handle_stages_rename(state: &mut AppState, req: &Request) -> serde_json::Value {
    let index = match required_index(req, "index") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_text(req, "name") {
        Ok(v) => v.to_string(),
        Err(e) => return e,
    };
    with_form(state, req, |form| form.rename_stage(index, &name))
}

fn handle_stages_set_field(state: &mut AppState, req: &Request) -> serde_json::Value {
    let index = match required_index(req, "index") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let field_raw = match required_str(req, "field") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(field) = StageField::parse(&field_raw) else {
        return err(&req.id, "bad_params", format!("unknown stage field: {}", field_raw), None);
    };
    let value = match required_text(req, "value") {
        Ok(v) => v.to_string(),
        Err(e) => return e,
    };
    with_form(state, req, |form| form.set_stage_field(index, field, &value))
}

fn handle_forms_validate(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_form(state, req, LessonForm::validate)
}

fn handle_forms_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let form_id = match required_str(req, "formId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let AppState {
        db, config, forms, ..
    } = state;
    let Some(conn) = db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(form) = forms.get_mut(&form_id) else {
        return err(&req.id, "not_found", "form not found", None);
    };
    let store = SqliteLessonStore::new(conn, &config.owner_id);
    let result = form.save(&store).map(|_| ());
    respond(req, &form_id, form, result)
}

fn handle_forms_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let generator = state
        .config
        .generation_endpoint
        .as_deref()
        .map(HttpGenerator::new);
    with_form(state, req, |form| {
        form.generate(generator.as_ref().map(|g| g as &dyn Generator))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "forms.new" => Some(handle_forms_new(state, req)),
        "forms.edit" => Some(handle_forms_edit(state, req)),
        "forms.get" => Some(handle_forms_get(state, req)),
        "forms.close" => Some(handle_forms_close(state, req)),
        "forms.setField" => Some(handle_forms_set_field(state, req)),
        "forms.resources.set" => Some(handle_forms_resources_set(state, req)),
        "forms.stages.add" => Some(handle_stages_add(state, req)),
        "forms.stages.remove" => Some(handle_stages_remove(state, req)),
        "forms.stages.clear" => Some(handle_stages_clear(state, req)),
        "forms.stages.rename" => Some(handle_stages_rename(state, req)),
        "forms.stages.setField" => Some(handle_stages_set_field(state, req)),
        "forms.validate" => Some(handle_forms_validate(state, req)),
        "forms.save" => Some(handle_forms_save(state, req)),
        "forms.generate" => Some(handle_forms_generate(state, req)),
        _ => None,
    }
}
