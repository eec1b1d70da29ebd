use alloy_primitives::U256;
use eth_rpc_client::EthClientError;
use thiserror::Error;

/// Errors raised while reading the output oracle or the L2 chain
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Transport or node-side failure
    #[error("RPC error: {0}")]
    Rpc(#[from] EthClientError),
    /// Contract returned data that does not match the expected ABI
    #[error("Failed to decode {call} result: {source}")]
    AbiDecode {
        call: &'static str,
        #[source]
        source: alloy_sol_types::Error,
    },
    /// Contract returned an integer wider than 64 bits
    #[error("{field} value {value} does not fit into u64")]
    Overflow { field: &'static str, value: U256 },
}
