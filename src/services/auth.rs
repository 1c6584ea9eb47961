// src/services/auth.rs

use validator::Validate;

use crate::{
    api::{ApiClient, Auth},
    common::error::AppError,
    middleware::auth::{guard, RouteDecision, LOGIN_PATH},
    models::auth::{
        AuthResponse, LoginOutcome, LoginPayload, RegisterPayload, Session, TwoFactorChallenge,
        VerifyTwoFactorPayload,
    },
    storage::SessionStore,
};

pub const LOGIN_FAILED: &str = "Falha no login. Verifique suas credenciais.";
pub const REGISTER_FAILED: &str = "Falha no cadastro. Tente novamente.";
pub const VERIFY_FAILED: &str = "Código de verificação inválido.";

// Gerenciador de sessão: único escritor do SessionStore (além do 401 no transporte).
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn session(&self) -> &SessionStore {
        self.api.session()
    }

    pub async fn login(&self, credentials: LoginPayload) -> Result<LoginOutcome, AppError> {
        credentials.validate()?;

        let response: AuthResponse =
            self.api.post_json("/auth/login", &credentials, Auth::Public).await?;

        // 2FA ativo: nada é gravado até o código ser confirmado
        if response.user.requires_two_factor() {
            tracing::info!(user = %response.user.id, "Login requer segundo fator");
            return Ok(LoginOutcome::TwoFactorRequired(TwoFactorChallenge {
                credentials,
                user: response.user,
            }));
        }

        let session = self.complete(response)?;
        Ok(LoginOutcome::Authenticated(session))
    }

    pub async fn register(&self, payload: RegisterPayload) -> Result<Session, AppError> {
        // Validação local primeiro: sem rede se faltar campo ou a senha for curta
        payload.validate()?;

        let response: AuthResponse =
            self.api.post_json("/auth/register", &payload, Auth::Public).await?;
        tracing::info!(organization = %response.organization.slug, "✅ Organização cadastrada");
        self.complete(response)
    }

    pub async fn verify_two_factor(
        &self,
        challenge: &TwoFactorChallenge,
        token: &str,
    ) -> Result<Session, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::MissingFields(vec!["token".into()]));
        }

        let body = VerifyTwoFactorPayload { credentials: &challenge.credentials, token };
        let response: AuthResponse =
            self.api.post_json("/auth/verify-2fa", &body, Auth::Public).await?;
        self.complete(response)
    }

    // Grava token + usuário + organização juntos, ou nada
    fn complete(&self, response: AuthResponse) -> Result<Session, AppError> {
        let session = Session::try_from(response)?;
        self.session().persist(session.clone())?;
        tracing::info!(
            user = %session.user.id,
            organization = %session.organization.id,
            "✅ Sessão iniciada"
        );
        Ok(session)
    }

    /// Encerra a sessão e manda para o login. O estado em memória é limpo
    /// mesmo que a remoção no disco falhe.
    pub fn logout(&self) -> RouteDecision {
        if let Err(e) = self.session().clear() {
            tracing::error!("🔥 Logout: falha ao limpar o armazenamento: {}", e);
        }
        RouteDecision::Redirect(LOGIN_PATH)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    pub fn guard(&self, path: &str) -> RouteDecision {
        guard(path, self.is_authenticated())
    }
}
