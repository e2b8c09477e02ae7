use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_index, required_str, required_text};
use crate::ipc::types::{AppState, Request};
use crate::text::{backspace, ensure_bullet_prefix, insert_newline, TextStyle};
use serde_json::json;

fn handle_bullets_input(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let value = match required_text(req, "value") {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "value": ensure_bullet_prefix(value) }))
}

fn handle_bullets_newline(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let value = match required_text(req, "value") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let cursor = match required_index(req, "cursor") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let edit = insert_newline(value, cursor);
    ok(&req.id, json!({ "value": edit.value, "cursor": edit.cursor }))
}

fn handle_bullets_backspace(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let value = match required_text(req, "value") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let cursor = match required_index(req, "cursor") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let edit = backspace(value, cursor);
    ok(&req.id, json!({ "value": edit.value, "cursor": edit.cursor }))
}

fn handle_format(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let style_raw = match required_str(req, "style") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(style) = TextStyle::parse(&style_raw) else {
        return err(&req.id, "bad_params", format!("unknown style: {}", style_raw), None);
    };
    let value = match required_text(req, "value") {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "value": style.apply(value) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "text.bullets.input" => Some(handle_bullets_input(state, req)),
        "text.bullets.newline" => Some(handle_bullets_newline(state, req)),
        "text.bullets.backspace" => Some(handle_bullets_backspace(state, req)),
        "text.format" => Some(handle_format(state, req)),
        _ => None,
    }
}
