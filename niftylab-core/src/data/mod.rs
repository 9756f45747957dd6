//! Source tables, normalization, merge and volatility join.

pub mod archive;
pub mod attach;
pub mod circuit_breaker;
pub mod dates;
pub mod merge;
pub mod normalize;
pub mod provider;
pub mod schema;
pub mod table;
pub mod volatility;
pub mod yahoo;

pub use archive::CsvArchive;
pub use attach::attach_volatility;
pub use circuit_breaker::CircuitBreaker;
pub use dates::parse_calendar_date;
pub use merge::{merge_sources, MergeError, MergeReport};
pub use normalize::{normalize, NormalizedSource};
pub use provider::{DataError, SourceProvider};
pub use schema::{ColumnMap, SchemaError};
pub use table::RawTable;
pub use yahoo::YahooProvider;
