// src/services/users.rs

use validator::Validate;

use crate::{
    api::{ApiClient, Auth},
    common::error::AppError,
    middleware::tenancy::OrganizationContext,
    models::{
        tenancy::{MemberUser, NewOrganizationUser, OrganizationUser},
        Id,
    },
    services::resource_list::with_organization,
};

const LOAD_FAILED: &str = "Falha ao carregar os usuários";
const REMOVE_FAILED: &str = "Falha ao remover o usuário";
const CREATE_FAILED: &str = "Falha ao criar o usuário. Tente novamente.";

const NO_QUERY: &[(&str, &str)] = &[];

// Membros da organização atual (tabela de ligação usuário-organização).
// Remover um membro desfaz a ligação; o usuário continua existindo.
pub struct OrganizationUsers {
    api: ApiClient,
    members: Vec<OrganizationUser>,
    error: Option<String>,
}

impl OrganizationUsers {
    pub fn new(api: ApiClient) -> Self {
        Self { api, members: Vec::new(), error: None }
    }

    fn fail(&mut self, err: AppError, fallback: &str) -> AppError {
        if err.is_terminal() {
            self.members.clear();
        }
        self.error = Some(err.user_message(fallback));
        err
    }

    pub fn members(&self) -> &[OrganizationUser] {
        &self.members
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn load(&mut self) -> Result<&[OrganizationUser], AppError> {
        let ctx = OrganizationContext::from_session(self.api.session())
            .map_err(|e| self.fail(e, LOAD_FAILED))?;
        let organization_id = ctx.organization_id();

        let path = format!("/organization-users/{organization_id}");
        let result: Result<Vec<OrganizationUser>, AppError> =
            self.api.get_json(&path, NO_QUERY).await;
        let rows = result.map_err(|e| self.fail(e, LOAD_FAILED))?;

        self.members = rows.into_iter().filter(|m| &m.organization_id == organization_id).collect();
        self.error = None;
        Ok(&self.members)
    }

    /// Desfaz a ligação no servidor; a linha só sai da lista depois do OK.
    pub async fn remove(&mut self, organization_user_id: &Id) -> Result<(), AppError> {
        OrganizationContext::from_session(self.api.session())
            .map_err(|e| self.fail(e, REMOVE_FAILED))?;

        let result = self.api.delete(&format!("/organization-users/{organization_user_id}")).await;
        result.map_err(|e| self.fail(e, REMOVE_FAILED))?;

        self.members.retain(|m| &m.id != organization_user_id);
        self.error = None;
        tracing::info!(id = %organization_user_id, "Usuário removido da organização");
        Ok(())
    }

    /// Cria um usuário já vinculado à organização atual.
    pub async fn create_user(
        &mut self,
        payload: &NewOrganizationUser,
    ) -> Result<MemberUser, AppError> {
        payload.validate().map_err(|e| self.fail(e.into(), CREATE_FAILED))?;
        let ctx = OrganizationContext::from_session(self.api.session())
            .map_err(|e| self.fail(e, CREATE_FAILED))?;

        let body = with_organization(payload, "organizationId", ctx.organization_id())?;
        let result: Result<MemberUser, AppError> =
            self.api.post_json("/auth/create-user", &body, Auth::Bearer).await;
        let created = result.map_err(|e| self.fail(e, CREATE_FAILED))?;

        self.error = None;
        tracing::info!(user = %created.id, role = ?payload.role, "✅ Usuário criado na organização");
        Ok(created)
    }
}
