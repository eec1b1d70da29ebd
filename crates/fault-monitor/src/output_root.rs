//! Output root reconstruction from L2 block data.

use alloy_primitives::{keccak256, B256};

/// Version byte string prefixed to every version 0 output root pre-image
pub const OUTPUT_VERSION_V0: B256 = B256::ZERO;

/// Pre-image of a version 0 output root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputV0 {
    /// State trie root of the L2 block
    pub state_root: B256,
    /// Storage root of the L2ToL1MessagePasser predeploy at that block
    pub message_passer_storage_root: B256,
    /// Hash of the L2 block
    pub block_hash: B256,
}

impl OutputV0 {
    /// Compute `keccak256(version || state_root || message_passer_storage_root || block_hash)`
    pub fn output_root(&self) -> B256 {
        let mut preimage = [0u8; 128];
        preimage[..32].copy_from_slice(OUTPUT_VERSION_V0.as_slice());
        preimage[32..64].copy_from_slice(self.state_root.as_slice());
        preimage[64..96].copy_from_slice(self.message_passer_storage_root.as_slice());
        preimage[96..].copy_from_slice(self.block_hash.as_slice());
        keccak256(preimage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutputV0 {
        OutputV0 {
            state_root: B256::repeat_byte(0x01),
            message_passer_storage_root: B256::repeat_byte(0x02),
            block_hash: B256::repeat_byte(0x03),
        }
    }

    #[test]
    fn test_output_root_matches_concatenated_preimage() {
        let output = sample();
        let preimage = [
            B256::ZERO.as_slice(),
            output.state_root.as_slice(),
            output.message_passer_storage_root.as_slice(),
            output.block_hash.as_slice(),
        ]
        .concat();
        assert_eq!(preimage.len(), 128);
        assert_eq!(output.output_root(), keccak256(&preimage));
    }

    #[test]
    fn test_output_root_is_deterministic() {
        assert_eq!(sample().output_root(), sample().output_root());
    }

    #[test]
    fn test_output_root_is_order_sensitive() {
        let output = sample();
        let swapped = OutputV0 {
            state_root: output.message_passer_storage_root,
            message_passer_storage_root: output.state_root,
            block_hash: output.block_hash,
        };
        assert_ne!(output.output_root(), swapped.output_root());

        let mut other_hash = output;
        other_hash.block_hash = B256::repeat_byte(0x04);
        assert_ne!(output.output_root(), other_hash.output_root());
    }
}
