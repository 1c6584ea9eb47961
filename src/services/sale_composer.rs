// src/services/sale_composer.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    api::{ApiClient, Auth},
    common::error::AppError,
    middleware::tenancy::OrganizationContext,
    models::{
        crm::Customer,
        inventory::Crop,
        markets::Market,
        operations::{
            ApprovalStatus, CreatedSale, NewSaleLine, NewSalePayload, SaleHeader, SaleLine,
            SaleStatus, SaleStatusUpdate,
        },
        Id,
    },
    services::resource_list::{scope_to_organization, Resource},
};

const SUBMIT_FAILED: &str = "Falha ao criar a venda";
const STATUS_FAILED: &str = "Falha ao atualizar o status da venda";
const LOOKUPS_FAILED: &str = "Falha ao carregar os dados iniciais";

fn out_of_range() -> AppError {
    AppError::InvalidInput("valor da linha fora do limite".into())
}

// ---
// Aprovação / rejeição
// ---
// Por padrão a troca de status é só local. Quem monta o compositor decide
// se ela também vai para o servidor.
#[async_trait]
pub trait SaleStatusHandler: Send + Sync {
    async fn update_status(
        &self,
        api: &ApiClient,
        sale_id: &Id,
        status: ApprovalStatus,
    ) -> Result<(), AppError>;
}

/// Só muda o estado local.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOnlyStatusHandler;

#[async_trait]
impl SaleStatusHandler for LocalOnlyStatusHandler {
    async fn update_status(
        &self,
        _api: &ApiClient,
        sale_id: &Id,
        status: ApprovalStatus,
    ) -> Result<(), AppError> {
        tracing::debug!(%sale_id, ?status, "Status de aprovação alterado só localmente");
        Ok(())
    }
}

/// PATCH /sales/{id} com `{ "saleStatus": ... }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteStatusHandler;

#[async_trait]
impl SaleStatusHandler for RemoteStatusHandler {
    async fn update_status(
        &self,
        api: &ApiClient,
        sale_id: &Id,
        status: ApprovalStatus,
    ) -> Result<(), AppError> {
        api.patch(&format!("/sales/{sale_id}"), &SaleStatusUpdate { sale_status: status }).await
    }
}

// ---
// Listas de apoio do formulário
// ---
#[derive(Debug, Clone, Default)]
pub struct SaleLookups {
    pub clients: Vec<Customer>,
    pub markets: Vec<Market>,
    pub crops: Vec<Crop>,
}

/// Edição de um campo de uma linha.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEdit {
    CropId(Id),
    Quantity(Decimal),
    UnitPrice(Decimal),
    Description(String),
}

// ---
// Compositor
// ---
pub struct SaleComposer<H: SaleStatusHandler = LocalOnlyStatusHandler> {
    api: ApiClient,
    handler: H,
    header: SaleHeader,
    lines: Vec<SaleLine>,
    lookups: SaleLookups,
    sale_id: Option<Id>,
    status: ApprovalStatus,
    error: Option<String>,
    success: Option<String>,
}

impl SaleComposer<LocalOnlyStatusHandler> {
    pub fn new(api: ApiClient) -> Self {
        Self::with_handler(api, LocalOnlyStatusHandler)
    }
}

impl<H: SaleStatusHandler> SaleComposer<H> {
    pub fn with_handler(api: ApiClient, handler: H) -> Self {
        Self {
            api,
            handler,
            header: SaleHeader::default(),
            lines: Vec::new(),
            lookups: SaleLookups::default(),
            sale_id: None,
            status: ApprovalStatus::Draft,
            error: None,
            success: None,
        }
    }

    fn fail(&mut self, err: AppError, fallback: &str) -> AppError {
        self.success = None;
        self.error = Some(err.user_message(fallback));
        err
    }

    // --- Cabeçalho ---

    pub fn header(&self) -> &SaleHeader {
        &self.header
    }

    pub fn set_client(&mut self, client_id: impl Into<Id>) {
        let client_id: Id = client_id.into();
        self.header.client_id = (!client_id.is_empty()).then_some(client_id);
    }

    pub fn set_market(&mut self, market_id: impl Into<Id>) {
        let market_id: Id = market_id.into();
        self.header.market_id = (!market_id.is_empty()).then_some(market_id);
    }

    pub fn set_sale_date(&mut self, date: DateTime<Utc>) {
        self.header.sale_date = date;
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.header.notes = notes.into();
    }

    // --- Linhas ---

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn add_line(&mut self) -> &SaleLine {
        self.lines.push(SaleLine::blank(format!("temp-{}", Uuid::new_v4())));
        &self.lines[self.lines.len() - 1]
    }

    /// Altera um campo de uma linha. Quantidade e preço recalculam só o
    /// `lineAmount` desta linha.
    pub fn update_line(&mut self, index: usize, edit: LineEdit) -> Result<(), AppError> {
        let known_crop = match &edit {
            LineEdit::CropId(crop_id) => {
                self.lookups.crops.is_empty() || self.lookups.crops.iter().any(|c| &c.id == crop_id)
            }
            _ => true,
        };

        let line = self.lines.get_mut(index).ok_or(AppError::LineNotFound(index))?;
        match edit {
            LineEdit::CropId(crop_id) => {
                if !known_crop {
                    return Err(AppError::InvalidInput(format!("Cultura desconhecida: {crop_id}")));
                }
                line.crop_id = crop_id;
            }
            LineEdit::Quantity(quantity) => {
                if quantity.is_sign_negative() && !quantity.is_zero() {
                    let message = "A quantidade não pode ser negativa.";
                    return Err(AppError::InvalidInput(message.into()));
                }
                let amount =
                    SaleLine::amount_for(quantity, line.unit_price).ok_or_else(out_of_range)?;
                line.quantity = quantity;
                line.line_amount = amount;
            }
            LineEdit::UnitPrice(unit_price) => {
                let amount =
                    SaleLine::amount_for(line.quantity, unit_price).ok_or_else(out_of_range)?;
                line.unit_price = unit_price;
                line.line_amount = amount;
            }
            LineEdit::Description(description) => {
                line.description = Some(description);
            }
        }
        Ok(())
    }

    pub fn remove_line(&mut self, index: usize) -> Result<SaleLine, AppError> {
        if index >= self.lines.len() {
            return Err(AppError::LineNotFound(index));
        }
        Ok(self.lines.remove(index))
    }

    /// Soma dos `lineAmount`, calculada a cada leitura.
    pub fn total_amount(&self) -> Result<Decimal, AppError> {
        self.lines
            .iter()
            .try_fold(Decimal::ZERO, |total, l| total.checked_add(l.line_amount))
            .ok_or_else(out_of_range)
    }

    // --- Estado ---

    pub fn sale_id(&self) -> Option<&Id> {
        self.sale_id.as_ref()
    }

    pub fn status(&self) -> ApprovalStatus {
        self.status
    }

    pub fn lookups(&self) -> &SaleLookups {
        &self.lookups
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn success(&self) -> Option<&str> {
        self.success.as_deref()
    }

    /// Aprovar/rejeitar só faz sentido com a venda salva e ainda em DRAFT.
    pub fn can_change_status(&self) -> bool {
        self.sale_id.is_some() && !self.status.is_terminal()
    }

    /// Começa uma venda nova, mantendo as listas de apoio já carregadas.
    pub fn reset(&mut self) {
        self.header = SaleHeader::default();
        self.lines.clear();
        self.sale_id = None;
        self.status = ApprovalStatus::Draft;
        self.error = None;
        self.success = None;
    }

    // --- Rede ---

    /// Carrega clientes, mercados e culturas da organização em paralelo.
    pub async fn load_lookups(&mut self) -> Result<&SaleLookups, AppError> {
        let ctx = OrganizationContext::from_session(self.api.session())
            .map_err(|e| self.fail(e, LOOKUPS_FAILED))?;
        let org = ctx.organization_id().to_string();
        let query = [("organizationId", org.as_str())];

        let result = tokio::try_join!(
            self.api.get_json::<Vec<Customer>, _>(Customer::LIST_PATH, &query),
            self.api.get_json::<Vec<Market>, _>(Market::LIST_PATH, &query),
            self.api.get_json::<Vec<Crop>, _>("/crops", &query),
        );
        let (clients, markets, crops) = result.map_err(|e| self.fail(e, LOOKUPS_FAILED))?;

        let organization_id = ctx.organization_id();
        self.lookups = SaleLookups {
            clients: scope_to_organization(clients, organization_id),
            markets: scope_to_organization(markets, organization_id),
            crops: crops.into_iter().filter(|c| &c.organization_id == organization_id).collect(),
        };
        Ok(&self.lookups)
    }

    fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.header.client_id.is_none() {
            missing.push("clientId".to_string());
        }
        if self.header.market_id.is_none() {
            missing.push("marketId".to_string());
        }
        if self.lines.is_empty() {
            missing.push("lines".to_string());
        }
        missing
    }

    /// Envia cabeçalho + linhas numa única requisição e guarda o id gerado.
    pub async fn submit(&mut self) -> Result<Id, AppError> {
        if self.sale_id.is_some() {
            let err = AppError::InvalidTransition("a venda já foi enviada");
            return Err(self.fail(err, SUBMIT_FAILED));
        }
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(self.fail(AppError::MissingFields(missing), SUBMIT_FAILED));
        }
        let total_amount = self.total_amount().map_err(|e| self.fail(e, SUBMIT_FAILED))?;
        let ctx = OrganizationContext::from_session(self.api.session())
            .map_err(|e| self.fail(e, SUBMIT_FAILED))?;

        let (Some(client_id), Some(market_id)) =
            (self.header.client_id.clone(), self.header.market_id.clone())
        else {
            return Err(AppError::MissingFields(self.missing_fields()));
        };

        let payload = NewSalePayload {
            sale_date: self.header.sale_date,
            client_id,
            market_id,
            user_id: ctx.user_id.clone(),
            status: SaleStatus::Draft,
            total_amount,
            notes: self.header.notes.clone(),
            organization_id: ctx.organization.id.clone(),
            lines: self.lines.iter().map(NewSaleLine::from).collect(),
        };

        let result: Result<CreatedSale, AppError> =
            self.api.post_json("/sales", &payload, Auth::Bearer).await;
        let created = result.map_err(|e| self.fail(e, SUBMIT_FAILED))?;

        tracing::info!(sale_id = %created.id, linhas = payload.lines.len(), "✅ Venda criada");
        self.sale_id = Some(created.id.clone());
        self.error = None;
        self.success = Some("Venda criada com sucesso".into());
        Ok(created.id)
    }

    pub async fn approve(&mut self) -> Result<(), AppError> {
        self.transition(ApprovalStatus::Approved).await
    }

    pub async fn reject(&mut self) -> Result<(), AppError> {
        self.transition(ApprovalStatus::Rejected).await
    }

    async fn transition(&mut self, next: ApprovalStatus) -> Result<(), AppError> {
        let Some(sale_id) = self.sale_id.clone() else {
            return Err(self.fail(
                AppError::InvalidTransition("salve a venda antes de aprovar ou rejeitar"),
                STATUS_FAILED,
            ));
        };
        if self.status.is_terminal() {
            return Err(self.fail(
                AppError::InvalidTransition("a venda já foi aprovada ou rejeitada"),
                STATUS_FAILED,
            ));
        }

        let result = self.handler.update_status(&self.api, &sale_id, next).await;
        result.map_err(|e| self.fail(e, STATUS_FAILED))?;

        self.status = next;
        self.error = None;
        self.success = Some(match next {
            ApprovalStatus::Approved => "Venda aprovada com sucesso".into(),
            _ => "Venda rejeitada".into(),
        });
        tracing::info!(%sale_id, status = ?next, "Status de aprovação alterado");
        Ok(())
    }
}
