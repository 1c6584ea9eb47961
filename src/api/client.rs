// src/api/client.rs

use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{common::error::AppError, config::ClientConfig, storage::SessionStore};

/// Rotas de /auth vão sem token; todo o resto exige `Authorization: Bearer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Public,
    Bearer,
}

// Transporte HTTP único do cliente. É o único lugar que anexa o token e o
// único (além do AuthService) que pode encerrar a sessão: um 401 numa rota
// protegida derruba a sessão local para evitar o loop de token vencido.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("agritech-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url: config.base_url.clone(), session })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // Monta a requisição. Rotas protegidas sem token falham aqui,
    // antes de qualquer tráfego de rede.
    fn request(&self, method: Method, path: &str, auth: Auth) -> Result<RequestBuilder, AppError> {
        let builder = self.http.request(method, self.url(path));
        match auth {
            Auth::Public => Ok(builder),
            Auth::Bearer => {
                let token = self.session.token().ok_or(AppError::MissingToken)?;
                Ok(builder.bearer_auth(token))
            }
        }
    }

    async fn send(&self, builder: RequestBuilder, auth: Auth) -> Result<Response, AppError> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        // 401 no login é só credencial errada; nas rotas protegidas é token vencido
        if status == StatusCode::UNAUTHORIZED && auth == Auth::Bearer {
            tracing::warn!(url = %response.url(), "🔒 401 recebido; encerrando a sessão local");
            // Mesmo se o disco falhar, a sessão em memória já foi limpa
            let _ = self.session.clear();
            return Err(AppError::Unauthorized);
        }

        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body);
        tracing::warn!(%url, status = status.as_u16(), ?message, "Resposta de erro do servidor");
        Err(AppError::Server { status: status.as_u16(), message })
    }

    async fn json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        auth: Auth,
    ) -> Result<T, AppError> {
        let response = self.send(builder, auth).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // --- Verbos ---

    pub async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, AppError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path, Auth::Bearer)?.query(query);
        self.json(builder, Auth::Bearer).await
    }

    /// GET sem cache: usado pelo "Atualizar" da tabela de vendas.
    pub async fn get_json_fresh<T, Q>(&self, path: &str, query: &Q) -> Result<T, AppError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let stamp = chrono::Utc::now().timestamp_millis().to_string();
        let builder = self
            .request(Method::GET, path, Auth::Bearer)?
            .query(query)
            .query(&[("t", stamp)])
            .header(header::CACHE_CONTROL, "no-cache");
        self.json(builder, Auth::Bearer).await
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B, auth: Auth) -> Result<T, AppError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, path, auth)?.json(body);
        self.json(builder, auth).await
    }

    pub async fn patch_json<T, B>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::PATCH, path, Auth::Bearer)?.json(body);
        self.json(builder, Auth::Bearer).await
    }

    /// PATCH cujo corpo de resposta não interessa.
    pub async fn patch(&self, path: &str, body: &impl Serialize) -> Result<(), AppError> {
        let builder = self.request(Method::PATCH, path, Auth::Bearer)?.json(body);
        self.send(builder, Auth::Bearer).await.map(drop)
    }

    pub async fn delete(&self, path: &str) -> Result<(), AppError> {
        let builder = self.request(Method::DELETE, path, Auth::Bearer)?;
        self.send(builder, Auth::Bearer).await.map(drop)
    }
}

/// O servidor responde erros como `{ "message": "..." }`, às vezes com
/// `message` em lista (erros de validação) ou só `{ "error": "..." }`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let pick = |v: &Value| -> Option<String> {
        match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Array(items) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            _ => None,
        }
    };
    value.get("message").and_then(pick).or_else(|| value.get("error").and_then(pick))
}
