// src/middleware/tenancy.rs

use crate::{
    common::error::AppError,
    models::{tenancy::Organization, Id},
    storage::SessionStore,
};

// Contexto de organização de uma operação. Toda listagem e toda criação
// passam por aqui antes de tocar a rede.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationContext {
    pub organization: Organization,
    pub user_id: Id,
}

impl OrganizationContext {
    pub fn from_session(session: &SessionStore) -> Result<Self, AppError> {
        let current = session.current().ok_or(AppError::MissingToken)?;
        if current.access_token().trim().is_empty() {
            return Err(AppError::MissingToken);
        }
        if current.organization.id.is_empty() {
            return Err(AppError::InvalidOrganization);
        }
        Ok(Self { organization: current.organization, user_id: current.user.id })
    }

    pub fn organization_id(&self) -> &Id {
        &self.organization.id
    }
}
