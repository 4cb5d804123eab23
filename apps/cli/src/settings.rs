use std::{collections::HashMap, fs};

use shared::domain::PrincipalId;

#[derive(Debug)]
pub struct Settings {
    pub server_url: String,
    pub principal: Option<PrincipalId>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8443".into(),
            principal: None,
        }
    }
}

/// Defaults, then `leads.toml`, then environment. Command-line flags win
/// over all of these.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("leads.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            apply_file_config(&mut settings, &file_cfg);
        }
    }

    if let Ok(v) = std::env::var("LEADS_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Ok(v) = std::env::var("LEADS_PRINCIPAL") {
        if let Ok(parsed) = v.parse() {
            settings.principal = Some(parsed);
        }
    }

    settings
}

fn apply_file_config(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("server_url") {
        settings.server_url = v.clone();
    }
    if let Some(v) = file_cfg.get("principal") {
        if let Ok(parsed) = v.parse() {
            settings.principal = Some(parsed);
        }
    }
}
