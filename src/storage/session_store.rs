// src/storage/session_store.rs

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    common::error::AppError,
    models::{
        auth::{AuthUser, Session},
        settings::Theme,
        tenancy::Organization,
    },
    storage::kv_store::{KeyValueStore, MemoryStore},
};

// Chaves do armazenamento durável. Fazem parte do contrato com a interface
// existente, não renomear.
pub const TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "user";
pub const ORGANIZATION_KEY: &str = "organization";
pub const THEME_KEY: &str = "theme";

const SESSION_KEYS: [&str; 3] = [TOKEN_KEY, USER_KEY, ORGANIZATION_KEY];

/// Fonte única de "quem está logado e em qual organização".
///
/// Muitos leitores, um escritor: só o `AuthService` e o transporte HTTP
/// (ao receber 401) gravam ou limpam a sessão. Mudanças são publicadas num
/// canal `watch` para quem precisa reagir (ex.: voltar para o login).
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Box<dyn KeyValueStore>,
    state: watch::Sender<Option<Session>>,
}

impl SessionStore {
    /// Abre o armazenamento e restaura a sessão salva, se estiver completa.
    pub fn open<S>(backend: S) -> Result<Self, AppError>
    where
        S: KeyValueStore + 'static,
    {
        let restored = restore(&backend)?;
        if let Some(session) = &restored {
            tracing::info!(
                organization = %session.organization.id,
                "Sessão restaurada do armazenamento local"
            );
        }
        let (state, _) = watch::channel(restored);
        Ok(Self { inner: Arc::new(Inner { backend: Box::new(backend), state }) })
    }

    pub fn in_memory() -> Self {
        let (state, _) = watch::channel(None);
        Self { inner: Arc::new(Inner { backend: Box::new(MemoryStore::new()), state }) }
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.state.borrow().clone()
    }

    /// Verdadeiro se há um token não vazio persistido.
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .state
            .borrow()
            .as_ref()
            .is_some_and(|s| !s.access_token().is_empty())
    }

    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().as_ref().map(|s| s.access_token().to_string())
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.inner.state.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn organization(&self) -> Option<Organization> {
        self.inner.state.borrow().as_ref().map(|s| s.organization.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.state.subscribe()
    }

    /// Grava as três chaves de uma vez. Se a serialização ou o disco
    /// falharem, nada é gravado e o estado em memória não muda.
    pub(crate) fn persist(&self, session: Session) -> Result<(), AppError> {
        let entries = [
            (TOKEN_KEY, session.access_token().to_string()),
            (USER_KEY, serde_json::to_string(&session.user)?),
            (ORGANIZATION_KEY, serde_json::to_string(&session.organization)?),
        ];
        self.inner.backend.set_many(&entries)?;
        self.inner.state.send_replace(Some(session));
        Ok(())
    }

    /// Remove as três chaves. O estado em memória é limpo mesmo se o disco
    /// falhar: um token recusado pelo servidor não pode continuar em uso.
    pub(crate) fn clear(&self) -> Result<(), AppError> {
        let had_session = self.inner.state.send_replace(None).is_some();
        if had_session {
            tracing::info!("Sessão encerrada");
        }
        self.inner.backend.remove_many(&SESSION_KEYS).inspect_err(|e| {
            tracing::error!("🔥 Falha ao limpar a sessão do armazenamento local: {}", e);
        })
    }

    pub fn theme(&self) -> Theme {
        match self.inner.backend.get(THEME_KEY) {
            Ok(Some(raw)) => Theme::parse(&raw).unwrap_or_default(),
            Ok(None) => Theme::default(),
            Err(e) => {
                tracing::warn!("Não foi possível ler o tema salvo: {}", e);
                Theme::default()
            }
        }
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), AppError> {
        self.inner.backend.set(THEME_KEY, theme.as_str().to_string())
    }
}

// Sessão pela metade (token sem organização, JSON inválido...) é descartada
// e as chaves restantes são apagadas.
fn restore(backend: &dyn KeyValueStore) -> Result<Option<Session>, AppError> {
    let token = backend.get(TOKEN_KEY)?;
    let user = backend.get(USER_KEY)?;
    let organization = backend.get(ORGANIZATION_KEY)?;

    if token.is_none() && user.is_none() && organization.is_none() {
        return Ok(None);
    }

    let parsed = match (token, user, organization) {
        (Some(token), Some(user), Some(organization)) => {
            let user: Result<AuthUser, _> = serde_json::from_str(&user);
            let organization: Result<Organization, _> = serde_json::from_str(&organization);
            match (user, organization) {
                (Ok(user), Ok(organization)) => Session::new(token, user, organization).ok(),
                _ => None,
            }
        }
        _ => None,
    };

    if parsed.is_none() {
        tracing::warn!("Sessão salva incompleta ou inválida; descartando");
        backend.remove_many(&SESSION_KEYS)?;
    }
    Ok(parsed)
}
