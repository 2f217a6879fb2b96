//! Chain parameters and derived consensus bounds.

use std::fmt;
use std::str::FromStr;

/// Which network the node runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainNetwork {
    Mainnet,
    Testnet,
    Regtest,
}

impl FromStr for ChainNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(ChainNetwork::Mainnet),
            "testnet" => Ok(ChainNetwork::Testnet),
            "regtest" => Ok(ChainNetwork::Regtest),
            other => Err(format!("unknown network: {}", other)),
        }
    }
}

impl fmt::Display for ChainNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChainNetwork::Mainnet => "mainnet",
            ChainNetwork::Testnet => "testnet",
            ChainNetwork::Regtest => "regtest",
        };
        f.write_str(s)
    }
}

/// Static consensus parameters for one network.
#[derive(Debug, Clone)]
pub struct ChainParams {
    /// Which network these parameters describe.
    pub network: ChainNetwork,
    /// Target block spacing in seconds.
    pub target_spacing_secs: u64,
    /// Rolling window for base-target adjustment, in blocks.
    pub rolling_window_size: i32,
    /// Low-capacity calibration: genesis base target for 16 nonces instead
    /// of 1 TiB. Only regtest sets this.
    pub low_capacity_calibration: bool,
    /// Subsidy halving interval in blocks (one halving = four years).
    pub subsidy_halving_interval: i64,
    /// Blocks between an assignment's confirmation and its effect.
    pub assignment_activation_delay: i32,
}

impl ChainParams {
    /// Mainnet parameters.
    pub fn mainnet() -> Self {
        Self {
            network: ChainNetwork::Mainnet,
            target_spacing_secs: 600,
            rolling_window_size: 24,
            low_capacity_calibration: false,
            subsidy_halving_interval: 210_000,
            assignment_activation_delay: 360,
        }
    }

    /// Testnet parameters. Same schedule as mainnet, shorter activation
    /// delay for faster delegation testing.
    pub fn testnet() -> Self {
        Self {
            network: ChainNetwork::Testnet,
            assignment_activation_delay: 60,
            ..Self::mainnet()
        }
    }

    /// Regtest parameters: low-capacity calibration so a few megabytes of
    /// plots mine blocks, and near-instant assignment activation.
    pub fn regtest() -> Self {
        Self {
            network: ChainNetwork::Regtest,
            target_spacing_secs: 600,
            rolling_window_size: 24,
            low_capacity_calibration: true,
            subsidy_halving_interval: 150,
            assignment_activation_delay: 2,
        }
    }

    /// Genesis base target for these parameters.
    pub fn genesis_base_target(&self) -> u64 {
        genesis_base_target(self.target_spacing_secs, self.low_capacity_calibration)
    }

    /// Compression bounds at `height`.
    pub fn compression_bounds(&self, height: i64) -> CompressionBounds {
        compression_bounds(height, self.subsidy_halving_interval)
    }
}

/// Genesis base target, calibrated for a 1 TiB starting network capacity.
///
/// Each nonce covers 256 KiB, so 1 TiB is 2^22 nonces and the expected
/// minimum quality is 2^64 / 2^22 = 2^42. Dividing by the target spacing
/// puts the expected best deadline at one block time. Low-capacity mode
/// substitutes 2^60 (16 nonces) so development nodes can mine without
/// plotted storage.
pub fn genesis_base_target(target_spacing_secs: u64, low_capacity_calibration: bool) -> u64 {
    const POWER_42: u64 = 1 << 42;
    const POWER_60: u64 = 1 << 60;

    let base_power = if low_capacity_calibration {
        POWER_60
    } else {
        POWER_42
    };
    (base_power / target_spacing_secs.max(1)).max(1)
}

/// Allowed compression range for nonce submissions at some height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionBounds {
    /// Lowest accepted compression level.
    pub min_compression: u32,
    /// Highest accepted level, also the plotter optimisation target.
    pub target_compression: u32,
}

/// Compression bounds at `height`. The minimum steps up at years
/// 4/12/28/60/124, with one halving interval equal to four years.
pub fn compression_bounds(height: i64, subsidy_halving_interval: i64) -> CompressionBounds {
    let mut min_compression = 1;

    if height >= subsidy_halving_interval {
        min_compression = 2; // year 4
    }
    if height >= 3 * subsidy_halving_interval {
        min_compression = 3; // year 12
    }
    if height >= 7 * subsidy_halving_interval {
        min_compression = 4; // year 28
    }
    if height >= 15 * subsidy_halving_interval {
        min_compression = 5; // year 60
    }
    if height >= 31 * subsidy_halving_interval {
        min_compression = 6; // year 124
    }

    CompressionBounds {
        min_compression,
        target_compression: min_compression + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_base_target_mainnet() {
        // 2^42 / 600
        assert_eq!(genesis_base_target(600, false), 7_330_077_518);
    }

    #[test]
    fn genesis_base_target_low_capacity() {
        assert_eq!(genesis_base_target(600, true), (1u64 << 60) / 600);
    }

    #[test]
    fn genesis_base_target_never_zero() {
        assert_eq!(genesis_base_target(u64::MAX, false), 1);
        assert_eq!(genesis_base_target(0, false), 1 << 42);
    }

    #[test]
    fn compression_schedule_steps() {
        let halving = 210_000i64;
        assert_eq!(compression_bounds(0, halving).min_compression, 1);
        assert_eq!(compression_bounds(halving - 1, halving).min_compression, 1);
        assert_eq!(compression_bounds(halving, halving).min_compression, 2);
        assert_eq!(compression_bounds(3 * halving, halving).min_compression, 3);
        assert_eq!(compression_bounds(7 * halving, halving).min_compression, 4);
        assert_eq!(compression_bounds(15 * halving, halving).min_compression, 5);
        assert_eq!(compression_bounds(31 * halving, halving).min_compression, 6);
        assert_eq!(compression_bounds(100 * halving, halving).min_compression, 6);
    }

    #[test]
    fn target_is_min_plus_one() {
        for h in [0i64, 210_000, 3 * 210_000, 40 * 210_000] {
            let b = compression_bounds(h, 210_000);
            assert_eq!(b.target_compression, b.min_compression + 1);
        }
    }

    #[test]
    fn network_from_str() {
        use std::str::FromStr;
        assert_eq!(ChainNetwork::from_str("regtest").unwrap(), ChainNetwork::Regtest);
        assert!(ChainNetwork::from_str("moonnet").is_err());
    }
}
