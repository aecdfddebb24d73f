pub mod config;
pub mod error;
pub mod prices;
pub mod signal;
pub mod source;

pub use config::{ConfigError, VeloConfig};
pub use error::{Result, VeloError};
pub use prices::{CsvError, PriceObservation, PriceSeries};
pub use signal::{Action, ReversalEvent};
pub use source::{CsvDirSource, MemorySource, PriceSource, SourceError};
