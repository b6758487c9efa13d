//! Fixed-width token amounts.
//!
//! Amounts are `u64` counts of the smallest unit of a mint. Balances are
//! unsigned, so the only failure modes are a debit larger than the balance and
//! a credit past [`MAX_AMOUNT`]; both are reported as [`LedgerError`]s naming
//! the record involved.

use crate::error::LedgerError;
use crate::identity::Identity;

pub type Amount = u64;

pub const MAX_AMOUNT: Amount = Amount::MAX;

/// `balance + amount`, or [`LedgerError::Overflow`] for `record`.
pub fn checked_credit(
    record: &Identity,
    balance: Amount,
    amount: Amount,
) -> Result<Amount, LedgerError> {
    balance
        .checked_add(amount)
        .ok_or_else(|| LedgerError::Overflow {
            record: *record,
            current: balance,
            amount,
        })
}

/// `balance - amount`, or [`LedgerError::InsufficientFunds`] for `account`.
pub fn checked_debit(
    account: &Identity,
    balance: Amount,
    amount: Amount,
) -> Result<Amount, LedgerError> {
    balance
        .checked_sub(amount)
        .ok_or_else(|| LedgerError::InsufficientFunds {
            account: *account,
            balance,
            requested: amount,
        })
}

/// Render a raw amount in whole-token units, trimming trailing zeros.
///
/// `to_ui_string(1_000_000, 6) == "1"`, `to_ui_string(1_500, 3) == "1.5"`.
pub fn to_ui_string(amount: Amount, decimals: u8) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_detects_overflow() {
        let id = Identity::new([7u8; 32]);
        assert_eq!(checked_credit(&id, 1_000, 250).unwrap(), 1_250);
        let err = checked_credit(&id, MAX_AMOUNT, 1).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Overflow {
                record: id,
                current: MAX_AMOUNT,
                amount: 1
            }
        );
    }

    #[test]
    fn debit_detects_underflow() {
        let id = Identity::new([7u8; 32]);
        assert_eq!(checked_debit(&id, 1_000, 1_000).unwrap(), 0);
        match checked_debit(&id, 1_000, 1_001).unwrap_err() {
            LedgerError::InsufficientFunds {
                balance, requested, ..
            } => {
                assert_eq!(balance, 1_000);
                assert_eq!(requested, 1_001);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn ui_amounts_trim_trailing_zeros() {
        assert_eq!(to_ui_string(1_000_000, 6), "1");
        assert_eq!(to_ui_string(1_500, 3), "1.5");
        assert_eq!(to_ui_string(42, 6), "0.000042");
        assert_eq!(to_ui_string(0, 6), "0");
        assert_eq!(to_ui_string(1_000, 0), "1000");
        assert_eq!(to_ui_string(MAX_AMOUNT, 0), "18446744073709551615");
    }
}
