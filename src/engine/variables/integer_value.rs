/// The value type used for integer variable bounds.
///
/// The usable range is symmetric and strictly inside `i64`, so that the saturating arithmetic of
/// the `+`/`-` operators can never wrap: an overflow produces a value outside
/// [`IntegerValue::MIN`]..=[`IntegerValue::MAX`], which the next bound comparison then reports as
/// a crossed (empty) domain. This keeps propagators sound without explicit overflow checks at
/// every call site.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IntegerValue(pub i64);

impl IntegerValue {
    /// The largest value a variable bound may meaningfully take.
    pub const MAX: IntegerValue = IntegerValue(i64::MAX / 2);
    /// The smallest value a variable bound may meaningfully take.
    pub const MIN: IntegerValue = IntegerValue(-(i64::MAX / 2));

    pub const ZERO: IntegerValue = IntegerValue(0);
    pub const ONE: IntegerValue = IntegerValue(1);

    pub fn get(self) -> i64 {
        self.0
    }

    /// Whether the value is within the usable range; values outside it are the result of
    /// saturated arithmetic.
    pub fn is_in_usable_range(self) -> bool {
        IntegerValue::MIN <= self && self <= IntegerValue::MAX
    }
}

impl From<i64> for IntegerValue {
    fn from(value: i64) -> Self {
        IntegerValue(value)
    }
}

impl From<i32> for IntegerValue {
    fn from(value: i32) -> Self {
        IntegerValue(value as i64)
    }
}

impl std::ops::Add for IntegerValue {
    type Output = IntegerValue;
    fn add(self, rhs: IntegerValue) -> IntegerValue {
        IntegerValue(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for IntegerValue {
    type Output = IntegerValue;
    fn sub(self, rhs: IntegerValue) -> IntegerValue {
        IntegerValue(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::Neg for IntegerValue {
    type Output = IntegerValue;
    fn neg(self) -> IntegerValue {
        IntegerValue(self.0.saturating_neg())
    }
}

impl std::ops::AddAssign for IntegerValue {
    fn add_assign(&mut self, rhs: IntegerValue) {
        *self = *self + rhs;
    }
}

impl std::fmt::Display for IntegerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for IntegerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturated_addition_leaves_the_usable_range() {
        let result = IntegerValue::MAX + IntegerValue::MAX;

        assert!(!result.is_in_usable_range());
        assert!(result > IntegerValue::MAX);
    }

    #[test]
    fn negation_of_the_extremes_stays_symmetric() {
        assert_eq!(-IntegerValue::MAX, IntegerValue::MIN);
        assert_eq!(-IntegerValue::MIN, IntegerValue::MAX);
    }
}
