// src/middleware/auth.rs

// Guarda de rotas do painel. Espelha as regras do roteador da interface:
// rota protegida sem sessão vai para o login; login com sessão vai para o painel.

pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING: &str = "/dashboard";
const ROOT_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(&'static str),
}

// Padrões das rotas protegidas. `:id` casa com qualquer segmento não vazio.
const PROTECTED_ROUTES: &[&str] = &[
    "/",
    "/dashboard",
    "/inventory",
    "/clients",
    "/sales",
    "/vendors",
    "/vendors/add",
    "/vendors/edit/:id",
    "/markets",
    "/markets/add",
    "/markets/edit/:id",
    "/users",
];

fn matches_route(pattern: &str, path: &str) -> bool {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    pattern_parts.len() == path_parts.len()
        && pattern_parts
            .iter()
            .zip(&path_parts)
            .all(|(p, s)| p.starts_with(':') || p == s)
}

pub fn is_protected(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    PROTECTED_ROUTES.iter().any(|pattern| matches_route(pattern, path))
}

pub fn guard(path: &str, is_authenticated: bool) -> RouteDecision {
    let clean = path.split(['?', '#']).next().unwrap_or(path);
    let clean = if clean.len() > 1 { clean.trim_end_matches('/') } else { clean };

    if clean == LOGIN_PATH {
        return if is_authenticated {
            RouteDecision::Redirect(DEFAULT_LANDING)
        } else {
            RouteDecision::Allow
        };
    }

    if is_protected(clean) {
        return if is_authenticated {
            RouteDecision::Allow
        } else {
            RouteDecision::Redirect(LOGIN_PATH)
        };
    }

    // Rota desconhecida (o "*" do roteador)
    if is_authenticated {
        RouteDecision::Redirect(ROOT_PATH)
    } else {
        RouteDecision::Redirect(LOGIN_PATH)
    }
}
