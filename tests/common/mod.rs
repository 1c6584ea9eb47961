// tests/common/mod.rs
//
// Servidor falso da API AgriTech, em processo, numa porta efêmera.
// Devolve de propósito linhas de outra organização para exercitar o
// escopo feito pelo cliente.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use agritech_admin::{
    api::ApiClient,
    config::ClientConfig,
    models::auth::{LoginOutcome, LoginPayload},
    services::AuthService,
    storage::SessionStore,
};

const JWT_SECRET: &[u8] = b"mock-secret-key-for-tests-only";
pub const PASSWORD: &str = "secret123";
pub const OTP_EMAIL: &str = "otp@farm.io";
pub const OTP_CODE: &str = "123456";
pub const ORG_ID: &str = "org-1";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    org: String,
    exp: usize,
}

/// Requisição vista pelo servidor falso.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub cache_control: Option<String>,
}

#[derive(Default)]
pub struct Inner {
    pub requests: Vec<Recorded>,
    pub collections: HashMap<&'static str, Vec<Value>>,
    pub posted: Vec<(String, Value)>,
    pub patched: Vec<(String, Value)>,
    pub fail_deletes: bool,
    pub reject_tokens: bool,
    pub next_id: i64,
}

#[derive(Clone, Default)]
pub struct MockState(Arc<Mutex<Inner>>);

impl MockState {
    pub fn lock(&self) -> MutexGuard<'_, Inner> {
        self.0.lock().unwrap()
    }
}

pub struct MockApi {
    pub base_url: String,
    pub state: MockState,
}

impl MockApi {
    pub async fn start() -> Self {
        let state = MockState::default();
        seed(&mut state.lock());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url: format!("http://{addr}"), state }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig { base_url: self.base_url.clone(), ..Default::default() }
    }

    /// Cliente sem sessão.
    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config(), SessionStore::in_memory()).unwrap()
    }

    /// Cliente já autenticado em org-1.
    pub async fn logged_in(&self) -> ApiClient {
        let api = self.client();
        let outcome = AuthService::new(api.clone())
            .login(LoginPayload::new("ana@farm.io", PASSWORD))
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
        api
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.state.lock().fail_deletes = fail;
    }

    /// Passa a recusar qualquer token, como se todos tivessem vencido.
    pub fn expire_tokens(&self) {
        self.state.lock().reject_tokens = true;
    }

    pub fn posted(&self, path: &str) -> Vec<Value> {
        bodies_for(&self.state.lock().posted, path)
    }

    pub fn patched(&self, path: &str) -> Vec<Value> {
        bodies_for(&self.state.lock().patched, path)
    }
}

fn bodies_for(sent: &[(String, Value)], path: &str) -> Vec<Value> {
    sent.iter().filter(|(p, _)| p == path).map(|(_, v)| v.clone()).collect()
}

// ---
// Dados iniciais
// ---
fn seed(inner: &mut Inner) {
    inner.next_id = 100;
    inner.collections.insert(
        "clients",
        vec![
            client_row("c1", ORG_ID, "Amina", "Juma", "ACTIVE"),
            client_row("c2", ORG_ID, "Baraka", "Otieno", "INACTIVE"),
            client_row("c3", ORG_ID, "Amani", "Kariuki", "POTENTIAL"),
            client_row("c9", "org-2", "Foreign", "Row", "ACTIVE"),
        ],
    );
    inner.collections.insert(
        "vendors",
        vec![
            json!({"id": "v1", "vendorName": "Seeds Ltd", "phoneNumber": "111",
                   "vendorEmail": "sales@seeds.io", "address": "Arusha",
                   "vendorType": "SUPPLIER", "organizationId": ORG_ID}),
            json!({"id": "v2", "vendorName": "AgroMove", "phoneNumber": "222",
                   "vendorEmail": "hi@agromove.io", "address": "Moshi",
                   "vendorType": "DISTRIBUTOR", "organizationId": ORG_ID}),
            json!({"id": "v9", "vendorName": "Other Org Seeds", "phoneNumber": "999",
                   "vendorEmail": "x@y.io", "address": "",
                   "vendorType": "SUPPLIER", "organizationId": "org-2"}),
        ],
    );
    inner.collections.insert(
        "markets",
        vec![
            json!({"id": "m1", "marketName": "Kariakoo", "marketCode": "KRK",
                   "location": "Dar es Salaam", "opened": true,
                   "lastopenDate": "2024-03-01T08:00:00Z", "organizationId": ORG_ID}),
            json!({"id": "m2", "marketName": "Mwenge", "marketCode": "MWG",
                   "location": "Dar es Salaam", "opened": false, "organizationId": ORG_ID}),
            json!({"id": "m9", "marketName": "Elsewhere", "marketCode": "ELS",
                   "location": "Nairobi", "opened": true, "organizationId": "org-2"}),
        ],
    );
    inner.collections.insert(
        "items",
        vec![
            item_row("i1", ORG_ID, "Maize seed", 100, 0),
            item_row("i2", ORG_ID, "Fertilizer", 100, 15),
            item_row("i3", ORG_ID, "Hoe", 50, 40),
            item_row("i9", "org-2", "Foreign item", 5, 5),
        ],
    );
    inner.collections.insert(
        "sales",
        vec![
            json!({"id": 1, "saleDate": "2024-03-01", "clientId": "c1",
                   "clientName": "Amina Juma", "marketId": "m1", "status": "DRAFT",
                   "totalAmount": 47.5, "notes": "first", "organizationId": ORG_ID}),
            json!({"id": 2, "saleDate": "2024-03-02", "clientId": "c2",
                   "clientName": "Baraka Otieno", "marketId": "m1", "status": "CONFIRMED",
                   "totalAmount": 10, "organizationId": ORG_ID}),
            json!({"id": 9, "saleDate": "2024-03-03", "clientId": "c9",
                   "clientName": "Foreign", "marketId": "m9", "status": "DRAFT",
                   "totalAmount": 1, "organizationId": "org-2"}),
        ],
    );
    inner.collections.insert(
        "crops",
        vec![
            json!({"id": "cr1", "cropName": "Maize", "cropCode": "MZ", "organizationId": ORG_ID}),
            json!({"id": "cr2", "cropName": "Beans", "cropCode": "BN", "organizationId": ORG_ID}),
            json!({"id": "cr9", "cropName": "Coffee", "cropCode": "CF", "organizationId": "org-2"}),
        ],
    );
    inner.collections.insert(
        "organization-users",
        vec![
            json!({"id": 1, "user_id": 1, "organization_id": ORG_ID, "role": "OWNER",
                   "user": {"id": 1, "email": "ana@farm.io"}}),
            json!({"id": 2, "user_id": 2, "organization_id": ORG_ID,
                   "user": {"id": 2, "email": "juma@farm.io"}}),
            json!({"id": 9, "user_id": 9, "organization_id": "org-2", "role": "ADMIN",
                   "user": {"id": 9, "email": "other@else.io"}}),
        ],
    );
}

fn item_row(id: &str, org: &str, name: &str, quantity: u32, remaining: u32) -> Value {
    json!({
        "id": id,
        "itemName": name,
        "quantity": quantity,
        "remainingquantity": remaining,
        "organizationid": org,
    })
}

fn client_row(id: &str, org: &str, first: &str, last: &str, status: &str) -> Value {
    json!({
        "id": id,
        "firstName": first,
        "lastName": last,
        "phoneNumber": format!("+255 7{}", id.len()),
        "email": format!("{}@farm.io", first.to_lowercase()),
        "marketId": "m1",
        "location": "Morogoro",
        "farmSize": "2ha",
        "status": status,
        "organizationId": org,
    })
}

// ---
// Autenticação
// ---
fn issue_token(user_id: &str, org: &str) -> String {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
    let claims = Claims { sub: user_id.to_string(), org: org.to_string(), exp };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET)).unwrap()
}

fn auth_body(user: Value, organization: Value, token: &str) -> Value {
    json!({ "access_token": token, "user": user, "organization": organization })
}

fn org_one() -> Value {
    json!({"id": ORG_ID, "name": "Green Acres", "slug": "green-acres", "role": "OWNER"})
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if password != PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    if email == OTP_EMAIL {
        // O servidor ainda manda um token, mas ele não vale sem o segundo fator
        let user = json!({"id": 7, "email": email, "twoFactorEnabled": true});
        return Json(auth_body(user, org_one(), "pending")).into_response();
    }
    let user = json!({"id": 1, "email": email, "twoFactorEnabled": false});
    Json(auth_body(user, org_one(), &issue_token("1", ORG_ID))).into_response()
}

async fn verify_two_factor(Json(body): Json<Value>) -> Response {
    if body["email"] != OTP_EMAIL || body["password"] != PASSWORD || body["token"] != OTP_CODE {
        return error(StatusCode::BAD_REQUEST, "Invalid 2FA token");
    }
    let user = json!({"id": 7, "email": OTP_EMAIL, "twoFactorEnabled": true});
    Json(auth_body(user, org_one(), &issue_token("7", ORG_ID))).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if email == "ana@farm.io" {
        return error(StatusCode::CONFLICT, "Email already registered");
    }
    let organization = json!({
        "id": "org-new",
        "name": body["organizationName"],
        "slug": body["organizationSlug"],
        "role": "OWNER",
    });
    let user = json!({"id": 50, "email": email});
    Json(auth_body(user, organization, &issue_token("50", "org-new"))).into_response()
}

// Conta tudo e recusa token inválido nas rotas protegidas
async fn require_token(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let query: HashMap<String, String> = request
        .uri()
        .query()
        .map(|q| {
            q.split('&')
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let cache_control = request
        .headers()
        .get(header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let path = request.uri().path().to_string();
    let reject_all = {
        let mut inner = state.lock();
        inner.requests.push(Recorded {
            method: request.method().to_string(),
            path: path.clone(),
            query,
            authorization: authorization.clone(),
            cache_control,
        });
        inner.reject_tokens
    };

    if path.starts_with("/auth/") && path != "/auth/create-user" {
        return next.run(request).await;
    }

    let valid = authorization
        .as_deref()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| {
            let key = DecodingKey::from_secret(JWT_SECRET);
            decode::<Claims>(token, &key, &Validation::default()).is_ok()
        })
        .unwrap_or(false);

    if reject_all || !valid {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    next.run(request).await
}

// ---
// Coleções genéricas
// ---
fn id_matches(row: &Value, id: &str) -> bool {
    match &row["id"] {
        Value::String(s) => s == id,
        Value::Number(n) => n.to_string() == id,
        _ => false,
    }
}

fn list(state: &MockState, name: &'static str) -> Response {
    // Ignora organizationId de propósito
    let rows = state.lock().collections.get(name).cloned().unwrap_or_default();
    Json(rows).into_response()
}

fn find(state: &MockState, name: &'static str, id: &str) -> Response {
    let inner = state.lock();
    match inner.collections.get(name).and_then(|rows| rows.iter().find(|r| id_matches(r, id))) {
        Some(row) => Json(row.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Not found"),
    }
}

fn create(state: &MockState, name: &'static str, path: String, mut body: Value) -> Response {
    let mut inner = state.lock();
    inner.posted.push((path, body.clone()));
    inner.next_id += 1;
    let id = format!("new-{}", inner.next_id);
    body["id"] = json!(id);
    inner.collections.entry(name).or_default().push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

fn update(state: &MockState, name: &'static str, path: String, id: &str, body: Value) -> Response {
    let mut inner = state.lock();
    inner.patched.push((path, body.clone()));
    let row = inner
        .collections
        .get_mut(name)
        .and_then(|rows| rows.iter_mut().find(|r| id_matches(r, id)));
    let Some(row) = row else {
        return error(StatusCode::NOT_FOUND, "Not found");
    };
    if let (Some(target), Some(changes)) = (row.as_object_mut(), body.as_object()) {
        for (k, v) in changes {
            target.insert(k.clone(), v.clone());
        }
    }
    Json(row.clone()).into_response()
}

fn remove(state: &MockState, name: &'static str, id: &str) -> Response {
    let mut inner = state.lock();
    if inner.fail_deletes {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable");
    }
    let Some(rows) = inner.collections.get_mut(name) else {
        return error(StatusCode::NOT_FOUND, "Not found");
    };
    let before = rows.len();
    rows.retain(|r| !id_matches(r, id));
    if rows.len() == before {
        return error(StatusCode::NOT_FOUND, "Not found");
    }
    Json(json!({ "deleted": true })).into_response()
}

// Mercados listam em /market e criam em /markets; o resto usa a mesma rota
fn collection(
    name: &'static str,
    list_path: &str,
    create_path: &str,
    detail_path: &str,
) -> Router<MockState> {
    let post_path = create_path.to_string();
    let detail_prefix = detail_path.trim_end_matches("/{id}").to_string();

    let list_route = get(move |State(s): State<MockState>| async move { list(&s, name) });
    let create_route = post(move |State(s): State<MockState>, Json(body): Json<Value>| async move {
        create(&s, name, post_path, body)
    });
    let router = if list_path == create_path {
        Router::new().route(list_path, list_route.merge(create_route))
    } else {
        Router::new().route(list_path, list_route).route(create_path, create_route)
    };

    router.route(
        detail_path,
        get(move |State(s): State<MockState>, Path(id): Path<String>| async move {
            find(&s, name, &id)
        })
        .patch(
            move |State(s): State<MockState>, Path(id): Path<String>, Json(body): Json<Value>| {
                let path = format!("{detail_prefix}/{id}");
                async move { update(&s, name, path, &id, body) }
            },
        )
        .delete(move |State(s): State<MockState>, Path(id): Path<String>| async move {
            remove(&s, name, &id)
        }),
    )
}

async fn create_sale(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    let mut inner = state.lock();
    inner.posted.push(("/sales".into(), body.clone()));
    inner.next_id += 1;
    let id = inner.next_id;
    let mut row = body;
    row["id"] = json!(id);
    inner.collections.entry("sales").or_default().push(row);
    (StatusCode::CREATED, Json(json!({ "id": id }))).into_response()
}

async fn list_sales(
    State(state): State<MockState>,
    Query(_q): Query<HashMap<String, String>>,
) -> Response {
    list(&state, "sales")
}

async fn list_org_users(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    // O caminho traz o id da organização; ainda assim devolve tudo
    let _ = id;
    list(&state, "organization-users")
}

async fn remove_org_user(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    remove(&state, "organization-users", &id)
}

async fn create_user(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    let mut inner = state.lock();
    inner.posted.push(("/auth/create-user".into(), body.clone()));
    if body["organizationId"].as_str().unwrap_or_default().is_empty() {
        return error(StatusCode::BAD_REQUEST, "organizationId is required");
    }
    inner.next_id += 1;
    let created = json!({ "id": inner.next_id, "email": body["email"], "role": body["role"] });
    Json(created).into_response()
}

fn router(state: MockState) -> Router {
    let sales_detail = Router::new().route(
        "/sales/{id}",
        get(|State(s): State<MockState>, Path(id): Path<String>| async move {
            find(&s, "sales", &id)
        })
        .patch(|State(s): State<MockState>, Path(id): Path<String>, Json(body): Json<Value>| {
            let path = format!("/sales/{id}");
            async move { update(&s, "sales", path, &id, body) }
        })
        .delete(|State(s): State<MockState>, Path(id): Path<String>| async move {
            remove(&s, "sales", &id)
        }),
    );

    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/verify-2fa", post(verify_two_factor))
        .route("/auth/create-user", post(create_user))
        .merge(collection("clients", "/clients", "/clients", "/clients/{id}"))
        .merge(collection("vendors", "/vendors", "/vendors", "/vendors/{id}"))
        .merge(collection("markets", "/market", "/markets", "/market/{id}"))
        .merge(collection("items", "/items", "/items", "/items/{id}"))
        .route("/sales", get(list_sales).post(create_sale))
        .merge(sales_detail)
        .route("/crops", get(|State(s): State<MockState>| async move { list(&s, "crops") }))
        .route("/organization-users/{id}", get(list_org_users).delete(remove_org_user))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}
