//! FILENAME: core/dashboard-engine/src/snapshot.rs
//! PURPOSE: The on-disk `dashboard_data.json` projection.
//! CONTEXT: The auxiliary dashboards read this file instead of calling the
//! engine, so it is both integration artifact and cache. It is rewritten
//! atomically (temp file + rename) every time the primary contracts
//! dataset is replaced.

use crate::dataset::ContractsDataset;
use crate::derive::{compute_kpis, monthly_totals, split_deadlines, ugr_analysis, Thresholds};
use crate::error::DashboardError;
use crate::normalize::ContractRow;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::path::Path;

/// Builds the projection payload:
/// `{ kpis, monthly_consumption, ugr_analysis, expiring_contracts_list,
///    expired_contracts_list, raw_data_for_filters }`.
pub fn projection_payload(
    dataset: &ContractsDataset,
    today: NaiveDate,
    thresholds: &Thresholds,
) -> Value {
    let kpis = compute_kpis(&dataset.rows, today, thresholds);
    let (expiring, expired) = split_deadlines(&dataset.rows, today, thresholds);

    let monthly: Vec<Value> = dataset
        .months
        .iter()
        .zip(monthly_totals(&dataset.rows, &dataset.months))
        .map(|(info, total)| {
            json!({
                "Mês": info.first_day.format("%Y-%m").to_string(),
                "Consumo_Mensal": total,
            })
        })
        .collect();

    let records: Vec<Value> = dataset
        .rows
        .iter()
        .map(|row| contract_record(row, dataset))
        .collect();

    let expiring_records: Vec<Value> = expiring
        .iter()
        .filter_map(|entry| {
            dataset
                .rows
                .iter()
                .find(|row| {
                    row.descricao == entry.descricao
                        && row.ugr == entry.ugr
                        && row.contrato == entry.contrato
                })
                .map(|row| contract_record(row, dataset))
        })
        .collect();
    let expired_records: Vec<Value> = expired
        .iter()
        .filter_map(|entry| {
            dataset
                .rows
                .iter()
                .find(|row| {
                    row.descricao == entry.descricao
                        && row.ugr == entry.ugr
                        && row.contrato == entry.contrato
                })
                .map(|row| contract_record(row, dataset))
        })
        .collect();

    json!({
        "kpis": {
            "total_anual_estimado": kpis.total_estimado,
            "total_empenhado": kpis.executado,
            "total_comprometido": kpis.empenhado,
            "saldo_a_empenhar": kpis.saldo,
            "percentual_execucao": kpis.execucao_percentual,
            "taxa_execucao": kpis.execucao_percentual,
            "count_expiring_contracts": expiring.len(),
            "count_expired_contracts": expired.len(),
        },
        "monthly_consumption": monthly,
        "ugr_analysis": ugr_analysis(&dataset.rows, today),
        "expiring_contracts_list": expiring_records,
        "expired_contracts_list": expired_records,
        "raw_data_for_filters": records,
    })
}

/// One contract in the projection's record shape.
fn contract_record(row: &ContractRow, dataset: &ContractsDataset) -> Value {
    let mut record = Map::new();
    record.insert("Despesa".into(), json!(row.descricao));
    record.insert("UGR".into(), json!(row.ugr));
    record.insert("PI_2025".into(), json!(row.pi));
    record.insert("CNPJ".into(), json!(row.cnpj));
    record.insert("Processo".into(), json!(row.processo));
    record.insert("Numero_Contrato".into(), json!(row.contrato));
    record.insert(
        "Data_Vigencia_Fim".into(),
        json!(row
            .vigencia
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()),
    );
    record.insert("Status_Contrato".into(), json!(row.status));
    record.insert("Situacao_Prorrogacao".into(), json!(row.prorrogacao));
    record.insert(
        "Valor_Mensal_Medio_Contrato".into(),
        json!(row.valor_mensal),
    );
    record.insert("Total_Anual_Estimado".into(), json!(row.total_estimado));
    record.insert("Saldo_Empenhos_2025".into(), json!(row.saldo_empenhos));
    record.insert("Saldo_Empenhos_RAP".into(), json!(row.saldo_rap));
    record.insert("Total_Empenho_RAP".into(), json!(row.empenhado_total));
    record.insert("Executado_Total".into(), json!(row.executado_total));
    record.insert("Taxa_Execucao".into(), json!(row.execucao_pct));

    let mut total_necessario = 0.0;
    for (info, value) in dataset.months.iter().zip(row.months.iter()) {
        let label = format!("{} 00:00:00", info.first_day.format("%Y-%m-%d"));
        record.insert(label, json!(value));
        total_necessario += value;
    }
    record.insert("Total_Necessario".into(), json!(total_necessario));

    Value::Object(record)
}

/// Writes the projection atomically: serialize to `<path>.tmp`, then
/// rename over the target.
pub fn write_projection(path: &Path, payload: &Value) -> Result<(), DashboardError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("tmp");
    let body = serde_json::to_string_pretty(payload).unwrap_or_else(|_| "{}".to_string());
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
