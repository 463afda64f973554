pub mod handle;
pub mod query;
pub mod result;
pub mod time_serde;

pub use handle::{HANDLE_LEN, Handle, InvalidHandle};
pub use query::{
	DEFAULT_LIMIT, FilterCriteria, MAX_LIMIT, MAX_QUERY_CHARS, PriceSort, QueryFilters, SearchQuery,
};
pub use result::{
	BoostFactor, Candidate, CandidateMeta, CatalogAttributes, Channel, ChannelScore, RankedResult,
	ResultSet,
};
