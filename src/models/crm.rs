// src/models/crm.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Id;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientStatus {
    Active,
    Inactive,
    #[default]
    Potential, // Status padrão de um cliente novo
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VendorType {
    Supplier,
    Manufacturer,
    ServiceProvider, // Vira "SERVICE_PROVIDER"
    Distributor,
    Other,
}

// --- CLIENTE (rota /clients) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub market_id: Id,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub farm_size: String,
    pub status: ClientStatus,
    pub organization_id: Id,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// Formulário de criação/edição. O `organizationId` é anexado pelo controlador.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub market_id: String,
    pub location: String,
    pub farm_size: String,
    pub status: ClientStatus,
}

impl CustomerDraft {
    /// Campos obrigatórios vazios, na ordem do formulário.
    pub fn missing_fields(&self) -> Vec<String> {
        [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("phoneNumber", &self.phone_number),
            ("email", &self.email),
            ("marketId", &self.market_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect()
    }
}

// --- FORNECEDOR (rota /vendors) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: Id,
    pub vendor_name: String,
    pub phone_number: String,
    pub vendor_email: String,
    #[serde(default)]
    pub address: String,
    pub vendor_type: VendorType,
    pub organization_id: Id,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VendorDraft {
    #[validate(length(min = 1, message = "O nome do fornecedor é obrigatório."))]
    pub vendor_name: String,

    #[validate(length(min = 1, message = "O telefone é obrigatório."))]
    pub phone_number: String,

    #[validate(
        length(min = 1, message = "O e-mail é obrigatório."),
        email(message = "Formato de e-mail inválido.")
    )]
    pub vendor_email: String,

    pub address: String,

    // Option só para o formulário poder começar vazio
    #[validate(required(message = "O tipo de fornecedor é obrigatório."))]
    pub vendor_type: Option<VendorType>,
}
