// src/models/settings.rs

use serde::{Deserialize, Serialize};

// Preferência de tema da interface. Fica salva na chave `theme`
// e sobrevive ao logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    // Aceita também o formato antigo ("true"/"false" da chave darkMode)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "light" | "false" => Some(Theme::Light),
            "dark" | "true" => Some(Theme::Dark),
            _ => None,
        }
    }
}
