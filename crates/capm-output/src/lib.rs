#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod report;
pub mod summary;

pub use export::{
    CapmFitExport, ExportError, ExportFormat, Exporter, TableExport, TableRow, fit_records,
};
pub use report::{CorrelationExport, Report, ReportBuilder, ReportError};
pub use summary::{CapmSummary, correlation_table, significance, statistics_table};
