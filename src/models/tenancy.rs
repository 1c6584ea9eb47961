// src/models/tenancy.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Id;

// ---
// 1. Organization (o "Tenant")
// ---
// Toda entidade de negócio pertence a exatamente uma organização.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Id,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub role: String,
}

// ---
// 2. Papéis dentro da organização
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    Member,
    Admin,
    Owner,
}

// ---
// 3. OrganizationUser (a "Ponte" Usuário-Organização)
// ---
// O servidor usa snake_case nesta rota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationUser {
    pub id: Id,
    pub user_id: Id,
    pub organization_id: Id,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user: Option<MemberUser>,
}

impl OrganizationUser {
    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.email.as_str())
    }

    // Sem papel informado, a interface mostra USER
    pub fn role_label(&self) -> &str {
        self.role.as_deref().unwrap_or("USER")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberUser {
    pub id: Id,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

// Cadastro de usuário dentro da organização atual (POST /auth/create-user)
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganizationUser {
    #[validate(
        length(min = 1, message = "O e-mail é obrigatório."),
        email(message = "Formato de e-mail inválido.")
    )]
    pub email: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
    pub role: UserRole,
}
