// src/config.rs

use std::{env, path::PathBuf, time::Duration};

use crate::common::error::AppError;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SESSION_FILE: &str = ".agritech-session.json";
// A tabela de vendas se atualiza sozinha a cada 5 minutos
const DEFAULT_SALES_REFRESH_SECS: u64 = 300;

// Configuração do cliente, lida do ambiente (.env)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub session_file: PathBuf,
    pub sales_refresh_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            sales_refresh_interval: Duration::from_secs(DEFAULT_SALES_REFRESH_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave/valor.
    /// Útil nos testes, onde mexer no ambiente do processo não é seguro.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = lookup("BACKEND_URL")
            .or_else(|| lookup("VITE_BACKEND_URL"))
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "BACKEND_URL deve começar com http:// ou https:// (recebido: {base_url})"
            )));
        }

        let timeout = parse_secs(&lookup, "API_TIMEOUT_SECS")?.unwrap_or(defaults.timeout);
        let sales_refresh_interval = parse_secs(&lookup, "SALES_REFRESH_SECS")?
            .unwrap_or(defaults.sales_refresh_interval);

        let session_file = lookup("SESSION_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.session_file);

        Ok(Self {
            base_url,
            timeout,
            session_file,
            sales_refresh_interval,
        })
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<Duration>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("{key} deve ser um número de segundos")))?;
            if secs == 0 {
                return Err(AppError::Config(format!("{key} deve ser maior que zero")));
            }
            Ok(Some(Duration::from_secs(secs)))
        }
    }
}
