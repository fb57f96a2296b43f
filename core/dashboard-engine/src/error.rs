//! FILENAME: core/dashboard-engine/src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Não foi possível identificar registros válidos na planilha.")]
    EmptyInput,

    #[error("Dataset não encontrado ou expirado.")]
    UnknownDataset(String),

    #[error("Nenhuma base foi carregada.")]
    NoDatasets,

    #[error("Erro ao salvar a projeção do dashboard: {0}")]
    Projection(#[from] std::io::Error),
}
