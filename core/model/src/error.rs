//! FILENAME: core/model/src/error.rs

use crate::calc::CalcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Dataset não encontrado ou expirado.")]
    UnknownDataset(String),

    #[error("Coluna '{0}' não encontrada na base carregada.")]
    UnknownColumn(String),

    #[error(transparent)]
    Calculation(#[from] CalcError),
}
