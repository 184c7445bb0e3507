#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod clean;
pub mod error;
pub mod excess;
pub mod prices;
pub mod returns;
pub mod risk_free;
pub mod stats;
pub mod table;

pub use clean::{clean_prices, plain_identifier};
pub use error::{Result, ReturnsError};
pub use excess::{AlignmentPolicy, ExcessReturnTable};
pub use prices::{PriceField, PriceTable};
pub use returns::ReturnTable;
pub use risk_free::{DailyRiskFree, RateSeries, RateUnit, THREE_MONTH_TERM_DAYS};
pub use stats::{CorrelationMatrix, SummaryStatistics, correlation_matrix, describe};
pub use table::{DATE, DateTable};
