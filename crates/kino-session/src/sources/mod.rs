//! Source directory interface
//!
//! The directory knows which sources/CDNs exist and which one is current.
//! The session only asks it to fail over or refresh; it never picks a source.

mod cdn_list;

pub use cdn_list::CdnList;

use crate::{
    types::{FailoverRequest, TimeWindow},
    Result,
};
use async_trait::async_trait;

/// Ordered list of content sources
#[async_trait]
pub trait SourceDirectory: Send + Sync {
    /// Current window bounds
    fn time(&self) -> TimeWindow;

    /// Switch to the next source.
    ///
    /// Returns [`Error::SourcesExhausted`](crate::Error::SourcesExhausted) when
    /// there is nothing left to try; any error is treated as exhaustion.
    async fn failover(&self, request: FailoverRequest) -> Result<()>;

    /// Revalidate the current source's window bounds
    async fn refresh(&self) -> Result<()>;
}
