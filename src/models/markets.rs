// src/models/markets.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Id;

// Filtro da tabela de mercados (derivado do campo `opened`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketAvailability {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: Id,
    pub market_name: String,
    pub market_code: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub opened: bool,
    #[serde(default)]
    pub opening_date: Option<String>,
    // O servidor grava como `lastopenDate`
    #[serde(rename = "lastopenDate", default)]
    pub last_open_date: Option<String>,
    pub organization_id: Id,
}

impl Market {
    pub fn availability(&self) -> MarketAvailability {
        if self.opened { MarketAvailability::Open } else { MarketAvailability::Closed }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDraft {
    pub market_name: String,
    pub market_code: String,
    pub location: String,
    pub opened: bool,
    pub opening_date: Option<DateTime<Utc>>,
    #[serde(rename = "lastopenDate")]
    pub last_open_date: Option<DateTime<Utc>>,
}

impl MarketDraft {
    /// Abrir o mercado carimba a data da última abertura; fechar limpa.
    pub fn set_opened(&mut self, opened: bool, now: DateTime<Utc>) {
        self.opened = opened;
        self.last_open_date = if opened { Some(now) } else { None };
    }

    pub fn missing_fields(&self) -> Vec<String> {
        [
            ("marketName", &self.market_name),
            ("marketCode", &self.market_code),
            ("location", &self.location),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect()
    }
}
