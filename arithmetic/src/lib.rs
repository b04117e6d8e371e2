use easy_ext::ext;

#[ext(U64Ext)]
pub impl u64 {
    /// Applies a signed change to an unsigned quantity.
    ///
    /// Decreases saturate at zero. Returns [`None`] if an increase overflows.
    #[inline]
    #[must_use]
    fn apply_delta(self, delta: i64) -> Option<u64> {
        if delta.is_negative() {
            Some(self.saturating_sub(delta.unsigned_abs()))
        } else {
            self.checked_add(delta.unsigned_abs())
        }
    }

    #[inline]
    #[must_use]
    fn to_delta(self) -> Option<i64> {
        self.try_into().ok()
    }
}

#[ext(I64Ext)]
pub impl i64 {
    #[inline]
    #[must_use]
    fn checked_add_unsigned_delta(self, amount: u64) -> Option<i64> {
        self.checked_add(amount.to_delta()?)
    }

    #[inline]
    #[must_use]
    fn checked_sub_unsigned_delta(self, amount: u64) -> Option<i64> {
        self.checked_sub(amount.to_delta()?)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(10, 5 => Some(15))]
    #[test_case(10, -5 => Some(5))]
    #[test_case(10, -10 => Some(0))]
    #[test_case(10, -25 => Some(0); "decrease past zero saturates")]
    #[test_case(0, i64::MIN => Some(0))]
    #[test_case(u64::MAX, 1 => None; "increase past max overflows")]
    fn apply_delta(value: u64, delta: i64) -> Option<u64> {
        value.apply_delta(delta)
    }

    #[test]
    fn to_delta_rejects_values_above_i64_max() {
        assert_eq!(u64::MAX.to_delta(), None);
        assert_eq!(42_u64.to_delta(), Some(42));
    }

    #[test]
    fn unsigned_delta_operations_detect_overflow() {
        assert_eq!(5_i64.checked_add_unsigned_delta(3), Some(8));
        assert_eq!(5_i64.checked_sub_unsigned_delta(8), Some(-3));
        assert_eq!(i64::MAX.checked_add_unsigned_delta(1), None);
        assert_eq!(0_i64.checked_sub_unsigned_delta(u64::MAX), None);
    }
}
