use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// An overflowing schedule exceeds any representable debt, so it counts as covering.
pub fn covers_debt(amount: Decimal, term_length: u32, debt_amount: Decimal) -> bool {
    amount
        .checked_mul(Decimal::from(term_length))
        .map_or(true, |scheduled| scheduled >= debt_amount)
}

/// `base * multiplier` rounded up to whole units, saturating at `base` on overflow.
pub fn escalate(base: Decimal, multiplier: Decimal) -> Decimal {
    base.checked_mul(multiplier).unwrap_or(base).ceil()
}

/// Smallest term for which `amount` per period covers `debt_amount`.
///
/// `None` when `amount` is not positive or the term does not fit in `u32`.
pub fn reconcile_term(amount: Decimal, debt_amount: Decimal) -> Option<u32> {
    if amount <= Decimal::ZERO {
        return None;
    }
    let term = debt_amount.checked_div(amount)?.ceil();
    term.to_u32().map(|term| term.max(1))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstallmentSplit {
    pub regular_amount: Decimal,
    pub final_amount: Decimal,
}

impl InstallmentSplit {
    pub fn is_even(&self) -> bool {
        self.regular_amount == self.final_amount
    }
}

/// Whole-unit installments whose sum is exactly `total_amount`; the remainder lands on the
/// final installment.
pub fn split_installments(total_amount: Decimal, term_length: u32) -> Option<InstallmentSplit> {
    if term_length == 0 {
        return None;
    }
    let terms = Decimal::from(term_length);
    let regular_amount = (total_amount / terms).floor();
    let final_amount = total_amount - regular_amount * (terms - Decimal::ONE);
    Some(InstallmentSplit { regular_amount, final_amount })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{covers_debt, escalate, reconcile_term, split_installments};

    #[test]
    fn coverage_is_inclusive() {
        assert!(covers_debt(Decimal::from(200), 12, Decimal::from(2400)));
        assert!(covers_debt(Decimal::from(201), 12, Decimal::from(2400)));
        assert!(!covers_debt(Decimal::from(50), 12, Decimal::from(2400)));
    }

    #[test]
    fn overflowing_schedule_counts_as_covering() {
        let amount = Decimal::from_i128_with_scale(70_000_000_000_000_000_000_000_000_000, 0);
        assert!(covers_debt(amount, 12, Decimal::from(2400)));
        assert!(covers_debt(Decimal::MAX, u32::MAX, Decimal::MAX));
    }

    #[test]
    fn escalation_rounds_up_and_saturates() {
        assert_eq!(escalate(Decimal::from(192), Decimal::new(125, 2)), Decimal::from(240));
        assert_eq!(escalate(Decimal::MAX, Decimal::new(15, 1)), Decimal::MAX);
    }

    #[test]
    fn reconciled_term_rounds_up() {
        assert_eq!(reconcile_term(Decimal::from(240), Decimal::from(2400)), Some(10));
        assert_eq!(reconcile_term(Decimal::from(250), Decimal::from(2400)), Some(10));
        assert_eq!(reconcile_term(Decimal::from(300), Decimal::from(2400)), Some(8));
        assert_eq!(reconcile_term(Decimal::from(192), Decimal::from(2400)), Some(13));
    }

    #[test]
    fn reconciled_term_rejects_non_positive_amounts() {
        assert_eq!(reconcile_term(Decimal::ZERO, Decimal::from(2400)), None);
        assert_eq!(reconcile_term(Decimal::from(-5), Decimal::from(2400)), None);
    }

    #[test]
    fn uneven_split_puts_remainder_on_final_installment() {
        let split = split_installments(Decimal::from(2400), 7).expect("split");
        assert_eq!(split.regular_amount, Decimal::from(342));
        assert_eq!(split.final_amount, Decimal::from(348));
        assert!(!split.is_even());
    }

    #[test]
    fn split_sums_to_total_for_every_term() {
        let totals = [Decimal::from(1), Decimal::from(1200), Decimal::new(240_050, 2)];
        for total in totals {
            for term in 1..=60u32 {
                let split = split_installments(total, term).expect("split");
                let sum = split.regular_amount * Decimal::from(term - 1) + split.final_amount;
                assert_eq!(sum, total, "total {total} term {term}");
                assert!(split.final_amount >= Decimal::ZERO, "total {total} term {term}");
            }
        }
    }

    #[test]
    fn zero_term_has_no_split() {
        assert!(split_installments(Decimal::from(100), 0).is_none());
    }
}
