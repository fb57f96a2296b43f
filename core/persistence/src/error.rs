//! FILENAME: core/persistence/src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Extensão de arquivo '{0}' não é suportada.")]
    UnsupportedFormat(String),

    #[error("Não foi possível processar o arquivo: {0}")]
    Malformed(String),

    #[error("Arquivo lido, mas nenhum dado foi encontrado.")]
    EmptyInput,

    #[error("Cabeçalhos conflitantes após normalização: {0}")]
    SchemaConflict(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Erro ao gerar planilha Excel: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Erro ao gerar PDF: {0}")]
    Pdf(String),
}
