//! Historical data loading for dashgrid.
//!
//! A load cycle resolves the channels the current panels need, fetches the
//! missing ones in bounded chunks, and merges partial results into the
//! shared `DataPacket` as they arrive:
//! - Downsampling hint for ranges longer than 2 hours
//! - One combined request below 5 days, one request per channel above
//! - First non-success status wins; failures never block completion
//! - Generation ids fence responses of superseded loads

pub mod error;
pub mod loader;
pub mod plan;
pub mod source;

pub use error::{LoadError, LoadResult};
pub use loader::{ChunkOutcome, ChunkResponse, Completion, DataLoader, LoadStart, OnComplete};
pub use plan::{
    plan_requests, resample_factor, DataRequest, CHUNK_SPLIT_SECS, RESAMPLE_THRESHOLD_SECS,
};
pub use source::{
    spawn_requests, BoxFuture, DynSeriesSource, HttpSeriesSource, MockSeriesSource, SeriesSource,
};
