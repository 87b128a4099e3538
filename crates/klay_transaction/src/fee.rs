use klay_defaults::MAX_FEE_RATIO;
use klay_primitives::U256;

use crate::TxError;

/// The percentage of the transaction fee paid by the fee payer, in
/// `[1, 99]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeeRatio(u8);

impl FeeRatio {
    /// The smallest valid ratio.
    pub const MIN: FeeRatio = FeeRatio(1);
    /// The largest valid ratio.
    pub const MAX: FeeRatio = FeeRatio(MAX_FEE_RATIO - 1);

    /// Returns the ratio as a percentage.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for FeeRatio {
    type Error = TxError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value == 0 || value >= MAX_FEE_RATIO {
            Err(TxError::FeeRatioOutOfRange(value))
        } else {
            Ok(Self(value))
        }
    }
}

impl From<FeeRatio> for u8 {
    fn from(value: FeeRatio) -> Self {
        value.0
    }
}

impl alloy_rlp::Encodable for FeeRatio {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.0.encode(out);
    }

    fn length(&self) -> usize {
        self.0.length()
    }
}

impl alloy_rlp::Decodable for FeeRatio {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let ratio = u8::decode(buf)?;
        Self::try_from(ratio).map_err(alloy_rlp::Error::from)
    }
}

/// Splits `fee` into the shares of the fee payer and the sender, in that
/// order. The fee payer's share is rounded down.
pub fn calc_fee_with_ratio(ratio: FeeRatio, fee: U256) -> (U256, U256) {
    let ratio = U256::from(ratio.get());
    let denominator = U256::from(MAX_FEE_RATIO);

    // Splitting the fee avoids overflowing `fee * ratio`
    let fee_payer = fee / denominator * ratio + fee % denominator * ratio / denominator;

    (fee_payer, fee - fee_payer)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn ratio_bounds() {
        assert!(matches!(
            FeeRatio::try_from(0),
            Err(TxError::FeeRatioOutOfRange(0))
        ));
        assert!(matches!(
            FeeRatio::try_from(100),
            Err(TxError::FeeRatioOutOfRange(100))
        ));
        assert_eq!(FeeRatio::try_from(1).ok(), Some(FeeRatio::MIN));
        assert_eq!(FeeRatio::try_from(99).ok(), Some(FeeRatio::MAX));

        assert!(alloy_rlp::decode_exact::<FeeRatio>(alloy_rlp::encode(100u8)).is_err());
    }

    #[test]
    fn fee_split() -> anyhow::Result<()> {
        let ratio = FeeRatio::try_from(30)?;
        assert_eq!(
            calc_fee_with_ratio(ratio, U256::from(1_000)),
            (U256::from(300), U256::from(700))
        );
        // Rounds in favour of the fee payer
        assert_eq!(
            calc_fee_with_ratio(ratio, U256::from(7)),
            (U256::from(2), U256::from(5))
        );
        assert_eq!(
            calc_fee_with_ratio(FeeRatio::MAX, U256::MAX).0,
            U256::MAX / U256::from(100) * U256::from(99) + U256::from(34)
        );

        Ok(())
    }

    proptest! {
        #[test]
        fn shares_sum_to_fee(ratio in 1u8..=99, fee in any::<u128>()) {
            let ratio = FeeRatio::try_from(ratio).expect("ratio is in range");
            let fee = U256::from(fee);

            let (fee_payer, sender) = calc_fee_with_ratio(ratio, fee);
            prop_assert_eq!(fee_payer + sender, fee);
            prop_assert_eq!(fee_payer, fee * U256::from(ratio.get()) / U256::from(100));
        }
    }
}
