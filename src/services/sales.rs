// src/services/sales.rs

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    common::error::AppError,
    models::{operations::Sale, wire_name},
    services::resource_list::ResourceListController,
};

pub type SalesController = ResourceListController<Sale>;

const CSV_HEADERS: [&str; 6] =
    ["Sale ID", "Client Name", "Total Amount", "Status", "Sale Date", "Notes"];
const MISSING: &str = "N/A";

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn non_empty(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(MISSING)
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Planilha das vendas visíveis. Cabeçalho sem aspas; todo valor entre aspas.
pub fn sales_to_csv<'a, I>(sales: I) -> Result<String, AppError>
where
    I: IntoIterator<Item = &'a Sale>,
{
    let mut lines = vec![CSV_HEADERS.join(",")];

    for sale in sales {
        let id = sale.id.to_string();
        let total = sale.total_amount.map(money);
        let status = wire_name(&sale.status);
        let row = [
            non_empty(Some(id.as_str())),
            non_empty(sale.client_name.as_deref()),
            non_empty(total.as_deref()),
            non_empty(Some(status.as_str())),
            non_empty(sale.sale_date.as_deref()),
            sale.notes.as_deref().unwrap_or_default(),
        ];
        lines.push(row.iter().map(|v| quote(v)).collect::<Vec<_>>().join(","));
    }

    if lines.len() == 1 {
        return Err(AppError::NothingToExport);
    }
    Ok(lines.join("\n"))
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("sales_export_{}.csv", date.format("%Y-%m-%d"))
}

/// Grava a visão atual da tabela de vendas em `dir` e devolve o caminho.
pub fn export_visible(
    controller: &SalesController,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, AppError> {
    let visible = controller.visible();
    let csv = sales_to_csv(visible.iter().copied())?;
    let path = dir.join(export_file_name(date));
    std::fs::write(&path, csv)?;
    tracing::info!(registros = visible.len(), path = %path.display(), "✅ Vendas exportadas");
    Ok(path)
}
