//! FILENAME: core/model/src/lib.rs
//! Core data model for the analytics engine.
//!
//! Layers:
//! - `value`: cell values and flexible numeric/date parsing
//! - `column`: schema entries and header normalization
//! - `table`: column-oriented tables
//! - `collate`: pt-BR string ordering
//! - `calc`: calculated-column specs and pre-stage materialization
//! - `dataset` / `store`: uploaded datasets behind copy-on-write snapshots

pub mod calc;
pub mod collate;
pub mod column;
pub mod dataset;
pub mod error;
pub mod store;
pub mod table;
pub mod value;

pub use calc::{evaluate_pre_calc, CalcError, CalcStage, CalculationSpec, PreCalcColumn};
pub use column::{derive_key, key_is_identifier, normalize_label, ColumnKind, ColumnSchema, KeyAllocator};
pub use dataset::{Calculations, Dataset, DatasetSummary, PostColumnRef};
pub use error::StoreError;
pub use store::DatasetStore;
pub use table::{Column, Table};
pub use value::{parse_flexible_date, parse_flexible_number, CellValue};
