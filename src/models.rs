// src/models.rs

use std::{fmt, hash::Hash, str::FromStr};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::common::error::AppError;

pub mod auth;
pub mod crm;
pub mod inventory;
pub mod markets;
pub mod operations;
pub mod settings;
pub mod tenancy;

// ---
// Identificadores
// ---
// O servidor manda ids ora como string ("org-1"), ora como número (id do usuário).
// Guardamos o formato original para devolver o JSON igual ao recebido, mas a
// comparação é feita pela forma textual.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(i64),
    Text(String),
}

impl Id {
    pub fn is_empty(&self) -> bool {
        matches!(self, Id::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{n}"),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Id::Number(a), Id::Number(b)) => a == b,
            (Id::Text(a), Id::Text(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::Text(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id::Text(value)
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Number(value)
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::Text(String::new())
    }
}

// ---
// Filtro de status/tipo das listagens
// ---
// `All` é o sentinela "ALL" dos selects da interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter<T> {
    All,
    Only(T),
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Filter::All
    }
}

impl<T: PartialEq> Filter<T> {
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(expected) => expected == value,
        }
    }
}

impl<T: DeserializeOwned> FromStr for Filter<T> {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ALL") {
            Ok(Filter::All)
        } else {
            parse_wire_enum(s).map(Filter::Only)
        }
    }
}

/// Converte um valor do JSON ("LOW_STOCK", "service_provider"...) no enum correspondente.
pub fn parse_wire_enum<T: DeserializeOwned>(raw: &str) -> Result<T, AppError> {
    let normalized = raw.trim().to_uppercase().replace([' ', '-'], "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| AppError::InvalidInput(format!("Valor desconhecido: {raw}")))
}

/// Forma textual de um enum como ele aparece no JSON.
pub fn wire_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}
