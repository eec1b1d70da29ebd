//! Ethereum JSON-RPC client for reading blocks, account proofs and contract state.

use std::fmt;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U64};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::HttpClient;
use jsonrpsee::rpc_params;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

/// Error types for Ethereum RPC client operations
#[derive(Error, Debug)]
pub enum EthClientError {
    /// RPC client errors
    #[error("RPC client error: {0}")]
    RpcClient(#[from] jsonrpsee::core::client::Error),
    /// The node returned `null` for a block it does not know about
    #[error("Block {0} not found")]
    BlockNotFound(BlockId),
}

/// Default HTTP request timeout
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Block selector used by state-reading methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
    /// The current chain head
    Latest,
    /// A specific block height
    Number(u64),
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Latest => f.write_str("latest"),
            BlockId::Number(number) => write!(f, "{number:#x}"),
        }
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Subset of the block header fields returned by `eth_getBlockByNumber`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block height
    #[serde(deserialize_with = "quantity")]
    pub number: u64,
    /// Block hash as reported by the node
    pub hash: B256,
    /// State trie root after executing the block
    pub state_root: B256,
    /// Block timestamp in seconds
    #[serde(deserialize_with = "quantity")]
    pub timestamp: u64,
}

/// Subset of the `eth_getProof` response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProof {
    /// Root of the account's storage trie
    pub storage_hash: B256,
}

#[derive(Debug, Serialize)]
struct CallRequest {
    to: Address,
    data: Bytes,
}

fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    U64::deserialize(deserializer).map(|value| value.to::<u64>())
}

/// Ethereum RPC client
#[derive(Clone)]
pub struct EthClient {
    client: HttpClient,
}

impl EthClient {
    /// Create a new Ethereum RPC client with the default request timeout
    pub fn new(url: String) -> Result<Self, EthClientError> {
        let client = HttpClient::builder()
            .request_timeout(HTTP_REQUEST_TIMEOUT)
            .build(url)?;
        Ok(Self { client })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: ArrayParams,
    ) -> Result<T, EthClientError> {
        debug!("Sending {} request", method);
        self.client
            .request(method, params)
            .await
            .map_err(Into::into)
    }

    /// Get the chain id of the connected network
    pub async fn chain_id(&self) -> Result<u64, EthClientError> {
        let result: U64 = self.request("eth_chainId", rpc_params![]).await?;
        Ok(result.to::<u64>())
    }

    /// Get current chain height
    pub async fn block_number(&self) -> Result<u64, EthClientError> {
        let result: U64 = self.request("eth_blockNumber", rpc_params![]).await?;
        Ok(result.to::<u64>())
    }

    /// Get block header fields, without transactions
    pub async fn get_block(&self, id: BlockId) -> Result<Block, EthClientError> {
        let block: Option<Block> = self
            .request("eth_getBlockByNumber", rpc_params![id, false])
            .await?;
        block.ok_or(EthClientError::BlockNotFound(id))
    }

    /// Get the account proof for `address` at the given block
    pub async fn get_proof(
        &self,
        address: Address,
        storage_keys: &[B256],
        id: BlockId,
    ) -> Result<AccountProof, EthClientError> {
        self.request("eth_getProof", rpc_params![address, storage_keys, id])
            .await
    }

    /// Execute a read-only contract call
    pub async fn call(
        &self,
        to: Address,
        data: Bytes,
        id: BlockId,
    ) -> Result<Bytes, EthClientError> {
        self.request("eth_call", rpc_params![CallRequest { to, data }, id])
            .await
    }
}
