//! L2 chain reader providing the pre-image data of output roots.

use alloy_primitives::{address, Address, B256};
use async_trait::async_trait;
use eth_rpc_client::{Block, BlockId, EthClient};

#[cfg(test)]
use mockall::automock;

use crate::error::MonitorError;

/// L2ToL1MessagePasser predeploy, whose storage root is committed to in every output root
pub const L2_TO_L1_MESSAGE_PASSER: Address = address!("4200000000000000000000000000000000000016");

#[cfg_attr(test, automock)]
#[async_trait]
pub trait L2Chain: Send + Sync {
    /// Current height of the local L2 view
    async fn latest_block_number(&self) -> Result<u64, MonitorError>;
    /// Current head of the local L2 view
    async fn latest_block(&self) -> Result<Block, MonitorError>;
    /// Block at the given height
    async fn block_at(&self, height: u64) -> Result<Block, MonitorError>;
    /// Storage root of `account` at the given height
    async fn storage_root(&self, account: Address, height: u64) -> Result<B256, MonitorError>;
}

#[async_trait]
impl L2Chain for EthClient {
    async fn latest_block_number(&self) -> Result<u64, MonitorError> {
        Ok(self.block_number().await?)
    }

    async fn latest_block(&self) -> Result<Block, MonitorError> {
        Ok(self.get_block(BlockId::Latest).await?)
    }

    async fn block_at(&self, height: u64) -> Result<Block, MonitorError> {
        Ok(self.get_block(BlockId::Number(height)).await?)
    }

    async fn storage_root(&self, account: Address, height: u64) -> Result<B256, MonitorError> {
        let proof = self
            .get_proof(account, &[], BlockId::Number(height))
            .await?;
        Ok(proof.storage_hash)
    }
}
