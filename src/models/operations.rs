// src/models/operations.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Id;

// --- Enums ---

// Status persistido no servidor. O cliente só cria vendas como DRAFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Draft,
    Confirmed,
    Invoiced,
    Paid,
    Cancelled,
}

// Status local de aprovação, separado do `status` persistido.
// APPROVED e REJECTED são terminais.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    #[default]
    Draft,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ApprovalStatus::Draft)
    }
}

// --- Linhas ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    // Linhas vindas do servidor podem não ter id próprio
    #[serde(default)]
    pub id: String,
    pub crop_id: Id,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SaleLine {
    // Linha nova: id temporário do cliente, tudo zerado
    pub fn blank(temp_id: String) -> Self {
        Self {
            id: temp_id,
            crop_id: Id::default(),
            quantity: Decimal::ZERO,
            unit_price: Decimal::ZERO,
            line_amount: Decimal::ZERO,
            description: None,
        }
    }

    /// `quantity * unit_price`, ou `None` se estourar o limite do Decimal.
    pub fn amount_for(quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
        quantity.checked_mul(unit_price)
    }
}

// --- Cabeçalho ---

#[derive(Debug, Clone, PartialEq)]
pub struct SaleHeader {
    pub client_id: Option<Id>,
    pub market_id: Option<Id>,
    pub sale_date: DateTime<Utc>,
    pub notes: String,
}

impl Default for SaleHeader {
    fn default() -> Self {
        Self { client_id: None, market_id: None, sale_date: Utc::now(), notes: String::new() }
    }
}

// --- Venda completa (rota /sales) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Id,
    #[serde(default)]
    pub sale_date: Option<String>,
    pub client_id: Id,
    #[serde(default)]
    pub client_name: Option<String>,
    pub market_id: Id,
    #[serde(default)]
    pub user_id: Option<Id>,
    pub status: SaleStatus,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
    pub organization_id: Id,
    #[serde(default)]
    pub lines: Vec<SaleLine>,
}

// Corpo do POST /sales: cabeçalho + linhas numa única requisição
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSalePayload {
    pub sale_date: DateTime<Utc>,
    pub client_id: Id,
    pub market_id: Id,
    pub user_id: Id,
    pub status: SaleStatus,
    pub total_amount: Decimal,
    pub notes: String,
    pub organization_id: Id,
    pub lines: Vec<NewSaleLine>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSaleLine {
    pub crop_id: Id,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_amount: Decimal,
    pub description: String,
}

impl From<&SaleLine> for NewSaleLine {
    fn from(line: &SaleLine) -> Self {
        Self {
            crop_id: line.crop_id.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_amount: line.line_amount,
            description: line.description.clone().unwrap_or_default(),
        }
    }
}

// O servidor devolve a venda criada; só o id interessa
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedSale {
    pub id: Id,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleStatusUpdate {
    pub sale_status: ApprovalStatus,
}
