use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, parse_opt_string, required_str};
use crate::ipc::types::{AppState, Request};
use crate::mode::Mode;
use crate::store::{LessonStore, SqliteLessonStore};
use serde_json::json;

fn handle_lessons_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let mode = match parse_opt_string(req.params.get("mode")) {
        Ok(None) => None,
        Ok(Some(s)) => match Mode::parse(&s) {
            Some(m) => Some(m),
            None => return err(&req.id, "bad_params", format!("unknown mode: {}", s), None),
        },
        Err(m) => return err(&req.id, "bad_params", format!("mode {}", m), None),
    };
    let store = SqliteLessonStore::new(conn, &state.config.owner_id);
    match store.list(mode) {
        Ok(lessons) => ok(&req.id, json!({ "lessons": lessons })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_lessons_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let lesson_id = match required_str(req, "lessonId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = SqliteLessonStore::new(conn, &state.config.owner_id);
    match store.load(&lesson_id) {
        Ok(lesson) => ok(&req.id, json!({ "lesson": lesson })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_lessons_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let lesson_id = match required_str(req, "lessonId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = SqliteLessonStore::new(conn, &state.config.owner_id);
    match store.delete(&lesson_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "lessons.list" => Some(handle_lessons_list(state, req)),
        "lessons.open" => Some(handle_lessons_open(state, req)),
        "lessons.delete" => Some(handle_lessons_delete(state, req)),
        _ => None,
    }
}
