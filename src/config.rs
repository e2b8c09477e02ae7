use rusqlite::Connection;
use serde_json::{json, Map, Value};

use crate::db;
use crate::mode::Mode;

pub const ENV_MODE: &str = "LESSONLY_MODE";
pub const ENV_OWNER_ID: &str = "LESSONLY_OWNER_ID";
pub const ENV_GENERATE_URL: &str = "LESSONLY_GENERATE_URL";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupSection {
    App,
    Generation,
    Forms,
}

impl SetupSection {
    pub const ALL: [SetupSection; 3] = [Self::App, Self::Generation, Self::Forms];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "app" => Some(Self::App),
            "generation" => Some(Self::Generation),
            "forms" => Some(Self::Forms),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Generation => "generation",
            Self::Forms => "forms",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::App => "setup.app",
            Self::Generation => "setup.generation",
            Self::Forms => "setup.forms",
        }
    }
}

pub fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::App => json!({
            "mode": Mode::default().as_str(),
            "ownerId": "local"
        }),
        SetupSection::Generation => json!({
            "endpoint": null
        }),
        SetupSection::Forms => json!({
            "capitalizeOnEdit": false
        }),
    }
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

pub fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match section {
            SetupSection::App => match k.as_str() {
                "mode" => {
                    let s = parse_string_max(v, k, 32)?;
                    let Some(mode) = Mode::parse(&s) else {
                        return Err(
                            "mode must be one of: teacher, teacherExtended, tutor, student".into(),
                        );
                    };
                    obj.insert(k.clone(), Value::String(mode.as_str().to_string()));
                }
                "ownerId" => {
                    let s = parse_string_max(v, k, 128)?;
                    if s.is_empty() {
                        return Err("ownerId must not be empty".into());
                    }
                    obj.insert(k.clone(), Value::String(s));
                }
                _ => return Err(format!("unknown app field: {}", k)),
            },
            SetupSection::Generation => match k.as_str() {
                "endpoint" => {
                    if v.is_null() {
                        obj.insert(k.clone(), Value::Null);
                        continue;
                    }
                    let s = parse_string_max(v, k, 2048)?;
                    if s.is_empty() {
                        obj.insert(k.clone(), Value::Null);
                    } else if s.starts_with("http://") || s.starts_with("https://") {
                        obj.insert(k.clone(), Value::String(s));
                    } else {
                        return Err("endpoint must be an http(s) URL".into());
                    }
                }
                _ => return Err(format!("unknown generation field: {}", k)),
            },
            SetupSection::Forms => match k.as_str() {
                "capitalizeOnEdit" => {
                    let b = v
                        .as_bool()
                        .ok_or_else(|| format!("{} must be boolean", k))?;
                    obj.insert(k.clone(), Value::Bool(b));
                }
                _ => return Err(format!("unknown forms field: {}", k)),
            },
        }
    }
    Ok(())
}

pub fn load_section(conn: &Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values fall back to defaults.
            if let Err(e) = merge_section_patch(section, &mut current, saved_obj) {
                log::warn!("ignoring saved {}: {}", section.key(), e);
                current = default_section(section);
            }
        }
    }
    Ok(current)
}

/// Settings every form session is built from. Read once per workspace open
/// and again after `setup.update`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub mode: Mode,
    pub owner_id: String,
    pub generation_endpoint: Option<String>,
    pub capitalize_on_edit: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            owner_id: "local".to_string(),
            generation_endpoint: None,
            capitalize_on_edit: false,
        }
    }
}

impl AppConfig {
    /// Defaults plus environment overrides, used before a workspace is open.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg
    }

    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        let mut cfg = Self::from_settings(conn)?;
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    fn from_settings(conn: &Connection) -> anyhow::Result<Self> {
        let app = load_section(conn, SetupSection::App)?;
        let generation = load_section(conn, SetupSection::Generation)?;
        let forms = load_section(conn, SetupSection::Forms)?;

        Ok(Self {
            mode: app
                .get("mode")
                .and_then(|v| v.as_str())
                .and_then(Mode::parse)
                .unwrap_or_default(),
            owner_id: app
                .get("ownerId")
                .and_then(|v| v.as_str())
                .unwrap_or("local")
                .to_string(),
            generation_endpoint: generation
                .get("endpoint")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            capitalize_on_edit: forms
                .get("capitalizeOnEdit")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        })
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = var(ENV_MODE) {
            match Mode::parse(raw.trim()) {
                Some(mode) => self.mode = mode,
                None => log::warn!("ignoring {}={:?}: unknown mode", ENV_MODE, raw),
            }
        }
        if let Some(owner) = var(ENV_OWNER_ID).filter(|s| !s.trim().is_empty()) {
            self.owner_id = owner.trim().to_string();
        }
        if let Some(url) = var(ENV_GENERATE_URL).filter(|s| !s.trim().is_empty()) {
            self.generation_endpoint = Some(url.trim().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        db::init_schema(&conn).expect("schema");
        conn
    }

    #[test]
    fn defaults_when_nothing_saved() {
        let conn = conn();
        let cfg = AppConfig::from_settings(&conn).expect("load");
        assert_eq!(cfg.mode, Mode::Teacher);
        assert_eq!(cfg.owner_id, "local");
        assert!(!cfg.capitalize_on_edit);
    }

    #[test]
    fn saved_sections_are_read() {
        let conn = conn();
        db::settings_set_json(&conn, "setup.app", &json!({ "mode": "tutor", "ownerId": "t-1" }))
            .expect("save");
        db::settings_set_json(&conn, "setup.forms", &json!({ "capitalizeOnEdit": true }))
            .expect("save");
        let app = load_section(&conn, SetupSection::App).expect("section");
        assert_eq!(app["mode"], "tutor");
        assert_eq!(app["ownerId"], "t-1");
        let forms = load_section(&conn, SetupSection::Forms).expect("section");
        assert_eq!(forms["capitalizeOnEdit"], true);
    }

    #[test]
    fn malformed_saved_section_falls_back_to_defaults() {
        let conn = conn();
        db::settings_set_json(&conn, "setup.app", &json!({ "mode": "wizard" })).expect("save");
        let app = load_section(&conn, SetupSection::App).expect("section");
        assert_eq!(app, default_section(SetupSection::App));
    }

    #[test]
    fn env_overrides_win() {
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| match k {
            ENV_MODE => Some("student".into()),
            ENV_GENERATE_URL => Some(" http://127.0.0.1:9/gen ".into()),
            _ => None,
        });
        assert_eq!(cfg.mode, Mode::Student);
        assert_eq!(cfg.generation_endpoint.as_deref(), Some("http://127.0.0.1:9/gen"));
        assert_eq!(cfg.owner_id, "local");
    }

    #[test]
    fn patch_rejects_unknown_keys_and_bad_urls() {
        let mut current = default_section(SetupSection::Generation);
        let patch = json!({ "endpoint": "ftp://x" });
        assert!(merge_section_patch(
            SetupSection::Generation,
            &mut current,
            patch.as_object().expect("object")
        )
        .is_err());
        let patch = json!({ "retries": 3 });
        assert!(merge_section_patch(
            SetupSection::Generation,
            &mut current,
            patch.as_object().expect("object")
        )
        .is_err());
    }
}
