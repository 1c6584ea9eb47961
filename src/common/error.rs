// src/common/error.rs

use thiserror::Error;

// As três famílias de erro que a interface sabe exibir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Token ou organização ausentes/inválidos. Bloqueia a tela até novo login.
    Auth,
    /// Erro local, detectado antes de qualquer chamada de rede.
    Validation,
    /// Falha de transporte ou resposta de erro do servidor. Recuperável.
    Network,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Lista os campos obrigatórios que ficaram vazios (nomes do JSON)
    #[error("Preencha todos os campos obrigatórios: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Token de autenticação não encontrado. Faça login novamente.")]
    MissingToken,

    #[error("Dados da organização não encontrados. Faça login novamente.")]
    MissingOrganization,

    #[error("Dados da organização inválidos. Faça login novamente.")]
    InvalidOrganization,

    // O servidor respondeu 401: a sessão já foi encerrada pelo transporte
    #[error("Sessão expirada ou inválida. Faça login novamente.")]
    Unauthorized,

    #[error("Erro do servidor ({status})")]
    Server { status: u16, message: Option<String> },

    #[error("Erro de rede: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Erro de armazenamento local: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Erro de serialização: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuração inválida: {0}")]
    Config(String),

    #[error("A linha {0} da venda não existe")]
    LineNotFound(usize),

    #[error("Operação não permitida: {0}")]
    InvalidTransition(&'static str),

    #[error("Nenhum registro disponível para exportar.")]
    NothingToExport,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::MissingToken
            | AppError::MissingOrganization
            | AppError::InvalidOrganization
            | AppError::Unauthorized => ErrorKind::Auth,

            AppError::ValidationError(_)
            | AppError::MissingFields(_)
            | AppError::InvalidInput(_)
            | AppError::LineNotFound(_)
            | AppError::InvalidTransition(_)
            | AppError::NothingToExport => ErrorKind::Validation,

            AppError::Server { .. }
            | AppError::Network(_)
            | AppError::Storage(_)
            | AppError::Serialization(_)
            | AppError::Config(_) => ErrorKind::Network,
        }
    }

    /// Erros terminais bloqueiam a tela (sem lista parcial) até o usuário
    /// autenticar de novo.
    pub fn is_terminal(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    /// Texto legível para o usuário. Usa a mensagem do servidor quando a
    /// resposta trouxe uma; senão, o `fallback` da operação.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AppError::ValidationError(errors) => {
                let mut details: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, field_errors)| {
                        field_errors.iter().map(move |e| match &e.message {
                            Some(m) => m.to_string(),
                            None => format!("{field}: {}", e.code),
                        })
                    })
                    .collect();
                // HashMap não tem ordem estável
                details.sort();
                if details.is_empty() {
                    self.to_string()
                } else {
                    details.join(" ")
                }
            }
            AppError::Server { message: Some(message), .. } => message.clone(),
            AppError::Server { message: None, .. } => fallback.to_string(),
            AppError::Network(e) if e.is_timeout() => {
                format!("{fallback} (tempo limite excedido)")
            }
            AppError::Network(_) | AppError::Storage(_) | AppError::Serialization(_) => {
                tracing::error!("Erro inesperado: {}", self);
                fallback.to_string()
            }
            other => other.to_string(),
        }
    }
}
