// src/models/auth.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{common::error::AppError, models::Id, models::tenancy::Organization};

// Usuário autenticado, como o servidor devolve no login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Id,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub two_factor_enabled: Option<bool>,
}

impl AuthUser {
    pub fn requires_two_factor(&self) -> bool {
        self.two_factor_enabled.unwrap_or(false)
    }
}

// Resposta de /auth/login, /auth/register e /auth/verify-2fa
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: AuthUser,
    pub organization: Organization,
}

// ---
// Sessão
// ---
// Token + usuário + organização. Só existe completa: um token vazio,
// ou sem usuário/organização, não vira sessão.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    access_token: String,
    pub user: AuthUser,
    pub organization: Organization,
}

impl Session {
    pub fn new(
        access_token: String,
        user: AuthUser,
        organization: Organization,
    ) -> Result<Self, AppError> {
        if access_token.trim().is_empty() {
            return Err(AppError::MissingToken);
        }
        if organization.id.is_empty() {
            return Err(AppError::InvalidOrganization);
        }
        Ok(Self { access_token, user, organization })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl TryFrom<AuthResponse> for Session {
    type Error = AppError;

    fn try_from(value: AuthResponse) -> Result<Self, Self::Error> {
        Session::new(value.access_token, value.user, value.organization)
    }
}

// ---
// Payloads
// ---

#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 1, message = "A senha é obrigatória."))]
    pub password: String,
}

impl LoginPayload {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into().trim().to_string(), password: password.into() }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[validate(
        length(min = 1, message = "Todos os campos são obrigatórios."),
        email(message = "O e-mail fornecido é inválido.")
    )]
    pub email: String,
    #[validate(length(min = 8, message = "A senha deve ter no mínimo 8 caracteres."))]
    pub password: String,
    #[validate(length(min = 1, message = "Todos os campos são obrigatórios."))]
    pub organization_name: String,
    #[validate(length(min = 1, message = "Todos os campos são obrigatórios."))]
    pub organization_slug: String,
}

// O segundo fator reenvia as credenciais do login junto com o código
#[derive(Debug, Clone, Serialize)]
pub struct VerifyTwoFactorPayload<'a> {
    #[serde(flatten)]
    pub credentials: &'a LoginPayload,
    pub token: &'a str,
}

/// Login com 2FA ativo: nada foi persistido ainda, falta o código.
#[derive(Debug, Clone)]
pub struct TwoFactorChallenge {
    pub credentials: LoginPayload,
    pub user: AuthUser,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(Session),
    TwoFactorRequired(TwoFactorChallenge),
}

/// "Fazenda São João" -> "fazenda-s-o-jo-o"; mesma regra do formulário de cadastro.
pub fn slugify(organization_name: &str) -> String {
    let mut slug = String::with_capacity(organization_name.len());
    let mut pending_dash = false;
    for c in organization_name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}
