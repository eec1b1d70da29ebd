//! L1 output oracle reader backed by `eth_call` against the L2OutputOracle contract.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use eth_rpc_client::{BlockId, EthClient};

#[cfg(test)]
use mockall::automock;

use crate::error::MonitorError;

sol! {
    interface IOptimismPortal {
        function L2_ORACLE() external view returns (address);
    }

    interface IL2OutputOracle {
        struct OutputProposal {
            bytes32 outputRoot;
            uint128 timestamp;
            uint128 l2BlockNumber;
        }

        function nextOutputIndex() external view returns (uint256);
        function getL2Output(uint256 _l2OutputIndex) external view returns (OutputProposal memory);
        function finalizationPeriodSeconds() external view returns (uint256);
    }
}

/// Output commitment posted to L1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputProposal {
    /// Posted output root
    pub output_root: B256,
    /// L1 timestamp at which the output was posted
    pub timestamp: u64,
    /// L2 block height the output commits to
    pub l2_block_number: u64,
}

/// Read access to the append-only list of posted outputs
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OutputOracle: Send + Sync {
    /// Number of outputs posted so far, i.e. the index the next output will take
    async fn next_output_index(&self) -> Result<u64, MonitorError>;
    /// Output at the given index
    async fn get_l2_output(&self, index: u64) -> Result<OutputProposal, MonitorError>;
    /// Time in seconds an output has to stay unchallenged before it is finalized
    async fn finalization_period_seconds(&self) -> Result<u64, MonitorError>;
}

/// L2OutputOracle contract reader
pub struct L2OutputOracle {
    client: EthClient,
    address: Address,
}

impl L2OutputOracle {
    pub fn new(client: EthClient, address: Address) -> Self {
        Self { client, address }
    }

    /// Resolve the oracle address through the OptimismPortal contract
    pub async fn from_portal(
        client: EthClient,
        portal_address: Address,
    ) -> Result<Self, MonitorError> {
        let address =
            eth_call(&client, portal_address, IOptimismPortal::L2_ORACLECall {}).await?;
        Ok(Self::new(client, address))
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl OutputOracle for L2OutputOracle {
    async fn next_output_index(&self) -> Result<u64, MonitorError> {
        let index = eth_call(
            &self.client,
            self.address,
            IL2OutputOracle::nextOutputIndexCall {},
        )
        .await?;
        to_u64("nextOutputIndex", index)
    }

    async fn get_l2_output(&self, index: u64) -> Result<OutputProposal, MonitorError> {
        let output = eth_call(
            &self.client,
            self.address,
            IL2OutputOracle::getL2OutputCall {
                _l2OutputIndex: U256::from(index),
            },
        )
        .await?;
        Ok(OutputProposal {
            output_root: output.outputRoot,
            timestamp: to_u64("timestamp", U256::from(output.timestamp))?,
            l2_block_number: to_u64("l2BlockNumber", U256::from(output.l2BlockNumber))?,
        })
    }

    async fn finalization_period_seconds(&self) -> Result<u64, MonitorError> {
        let period = eth_call(
            &self.client,
            self.address,
            IL2OutputOracle::finalizationPeriodSecondsCall {},
        )
        .await?;
        to_u64("finalizationPeriodSeconds", period)
    }
}

async fn eth_call<C: SolCall + Send>(
    client: &EthClient,
    to: Address,
    call: C,
) -> Result<C::Return, MonitorError> {
    let output = client
        .call(to, call.abi_encode().into(), BlockId::Latest)
        .await?;
    C::abi_decode_returns(&output).map_err(|source| MonitorError::AbiDecode {
        call: C::SIGNATURE,
        source,
    })
}

fn to_u64(field: &'static str, value: U256) -> Result<u64, MonitorError> {
    u64::try_from(value).map_err(|_| MonitorError::Overflow { field, value })
}
