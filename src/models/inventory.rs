// src/models/inventory.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::Id;

// --- 1. Situação do estoque (derivada, nunca gravada) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    // "LOW_STOCK" -> "low stock", como no selo da tabela
    pub fn label(self) -> &'static str {
        match self {
            StockStatus::InStock => "in stock",
            StockStatus::LowStock => "low stock",
            StockStatus::OutOfStock => "out of stock",
        }
    }
}

// --- 2. Itens do inventário (rota /items) ---
// Atenção: o servidor manda `remainingquantity` e `organizationid` tudo minúsculo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Id,
    #[serde(rename = "itemName")]
    pub item_name: String,
    pub quantity: Decimal,
    #[serde(rename = "remainingquantity")]
    pub remaining_quantity: Decimal,
    #[serde(rename = "organizationid")]
    pub organization_id: Id,
}

impl Item {
    /// Zerado = sem estoque; até 20% da quantidade total = estoque baixo.
    pub fn stock_status(&self) -> StockStatus {
        if self.remaining_quantity.is_zero() {
            return StockStatus::OutOfStock;
        }
        let threshold = self.quantity * Decimal::new(2, 1);
        if self.remaining_quantity <= threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ItemDraft {
    #[serde(rename = "itemName")]
    #[validate(length(min = 1, message = "O nome do item é obrigatório."))]
    pub item_name: String,

    #[validate(custom(function = "validate_not_negative"))]
    pub quantity: Decimal,

    #[serde(rename = "remainingquantity")]
    #[validate(custom(function = "validate_not_negative"))]
    pub remaining_quantity: Decimal,
}

impl ItemDraft {
    // Item novo: tudo que entrou ainda está disponível
    pub fn new(item_name: impl Into<String>, quantity: Decimal) -> Self {
        Self { item_name: item_name.into(), quantity, remaining_quantity: quantity }
    }
}

// --- 3. Culturas (rota /crops) ---
// Usadas como referência nas linhas de venda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    pub id: Id,
    pub crop_name: String,
    #[serde(default)]
    pub crop_code: String,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub season: String,
    pub organization_id: Id,
}
