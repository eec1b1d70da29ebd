//! Binary search for the oldest output that is still inside its fault proof window.

use tracing::info;

use crate::{error::MonitorError, oracle::OutputOracle};

/// An output is finalized once its fault proof window has fully elapsed
pub fn is_finalized(output_timestamp: u64, finalization_window: u64, current_time: u64) -> bool {
    output_timestamp.saturating_add(finalization_window) < current_time
}

/// Find the index of the first output that is not finalized at `current_time`.
///
/// Outputs are appended in timestamp order, so finalization is monotonic over indices and a
/// binary search over `[0, total_outputs)` needs `O(log n)` oracle reads. If every output is
/// finalized (or none were posted) the result is `total_outputs`, which is also the index of
/// the next output to be posted.
pub async fn find_first_unfinalized_output_index(
    oracle: &dyn OutputOracle,
    total_outputs: u64,
    finalization_window: u64,
    current_time: u64,
) -> Result<u64, MonitorError> {
    info!("Searching for first unfinalized output among {} outputs", total_outputs);

    let (mut low, mut high) = (0u64, total_outputs);
    while low < high {
        let mid = low + (high - low) / 2;
        let output = oracle.get_l2_output(mid).await?;
        if is_finalized(output.timestamp, finalization_window, current_time) {
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    info!("First unfinalized output index: {}", low);
    Ok(low)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use alloy_primitives::B256;
    use eth_rpc_client::{BlockId, EthClientError};

    use super::*;
    use crate::oracle::{MockOutputOracle, OutputProposal};

    fn oracle_with(timestamps: Vec<u64>) -> MockOutputOracle {
        let mut oracle = MockOutputOracle::new();
        oracle.expect_get_l2_output().returning(move |index| {
            Ok(OutputProposal {
                output_root: B256::repeat_byte(index as u8),
                timestamp: timestamps[index as usize],
                l2_block_number: (index + 1) * 100,
            })
        });
        oracle
    }

    #[tokio::test]
    async fn test_two_outputs_one_finalized() {
        // outputs posted at 1000 and 2000 with a 500s window, observed at 1700
        let oracle = oracle_with(vec![1000, 2000]);
        let index = find_first_unfinalized_output_index(&oracle, 2, 500, 1700)
            .await
            .unwrap();
        assert_eq!(index, 1);
    }

    #[tokio::test]
    async fn test_no_outputs() {
        let mut oracle = MockOutputOracle::new();
        oracle.expect_get_l2_output().never();
        let index = find_first_unfinalized_output_index(&oracle, 0, 500, 1700)
            .await
            .unwrap();
        assert_eq!(index, 0);
    }

    #[tokio::test]
    async fn test_all_finalized() {
        let oracle = oracle_with(vec![10, 20, 30, 40]);
        let index = find_first_unfinalized_output_index(&oracle, 4, 5, 1000)
            .await
            .unwrap();
        assert_eq!(index, 4);
    }

    #[tokio::test]
    async fn test_none_finalized() {
        let oracle = oracle_with(vec![10, 20, 30, 40]);
        let index = find_first_unfinalized_output_index(&oracle, 4, 1000, 15)
            .await
            .unwrap();
        assert_eq!(index, 0);
    }

    #[tokio::test]
    async fn test_deadline_equal_to_current_time_is_not_finalized() {
        let oracle = oracle_with(vec![100, 200, 300]);
        // 200 + 100 == 300 is still inside the window
        let index = find_first_unfinalized_output_index(&oracle, 3, 100, 300)
            .await
            .unwrap();
        assert_eq!(index, 1);
    }

    #[tokio::test]
    async fn test_boundary_for_every_split() {
        let timestamps: Vec<u64> = (0..13).map(|i| 1000 + i * 60).collect();
        let window = 120;
        for current_time in 900..2000 {
            let expected = timestamps
                .iter()
                .position(|&t| !is_finalized(t, window, current_time))
                .unwrap_or(timestamps.len()) as u64;
            let oracle = oracle_with(timestamps.clone());
            let index = find_first_unfinalized_output_index(
                &oracle,
                timestamps.len() as u64,
                window,
                current_time,
            )
            .await
            .unwrap();
            assert_eq!(index, expected, "current_time {current_time}");
        }
    }

    #[tokio::test]
    async fn test_logarithmic_number_of_reads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut oracle = MockOutputOracle::new();
        oracle.expect_get_l2_output().returning(move |index| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(OutputProposal {
                output_root: B256::ZERO,
                timestamp: index * 10,
                l2_block_number: index,
            })
        });

        let total = 1_000_000;
        let index = find_first_unfinalized_output_index(&oracle, total, 0, 5_000_000)
            .await
            .unwrap();
        assert_eq!(index, 500_000);
        assert!(calls.load(Ordering::SeqCst) <= 21);
    }

    #[tokio::test]
    async fn test_read_failure_aborts_search() {
        let mut oracle = MockOutputOracle::new();
        oracle.expect_get_l2_output().returning(|index| {
            Err(MonitorError::Rpc(EthClientError::BlockNotFound(
                BlockId::Number(index),
            )))
        });
        let res = find_first_unfinalized_output_index(&oracle, 8, 500, 1700).await;
        assert!(matches!(res, Err(MonitorError::Rpc(_))));
    }
}
