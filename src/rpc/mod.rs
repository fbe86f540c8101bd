mod rpc;
pub mod types;

use async_trait::async_trait;

pub use rpc::{BlockFetchError, RateLimitConfig, RetryConfig, RpcClient, RpcClientConfig};
#[cfg(test)]
pub use rpc::RpcError;
pub use types::{BlockResults, RawEvent};
#[cfg(test)]
pub use types::{RawAttribute, TxResult};

/// Anything that can produce the execution results of a block by height.
///
/// Implementations own their retry policy: a returned error means the height
/// is given up on, and no partial result is ever returned.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn block_results(&self, height: u64) -> Result<BlockResults, BlockFetchError>;
}
