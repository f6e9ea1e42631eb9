//! Common utility functions for estimate calculations.
//!
//! This module provides shared functionality used across the engine and its
//! consumers, including rounding and clamping of monetary values.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to `dp` decimal places using half-up rounding.
///
/// Values exactly at the midpoint are rounded away from zero.
///
/// # Arguments
///
/// * `value` - The decimal value to round
/// * `dp` - Number of decimal places to keep
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use agro_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(85.95), 1), dec!(86.0));
/// assert_eq!(round_half_up(dec!(116204.4), 0), dec!(116204));
/// assert_eq!(round_half_up(dec!(-12.5), 0), dec!(-13)); // Away from zero
/// ```
pub fn round_half_up(
    value: Decimal,
    dp: u32,
) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a currency amount to whole pesos.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use agro_core::calculations::common::round_currency;
///
/// assert_eq!(round_currency(dec!(232408.8)), dec!(232409));
/// ```
pub fn round_currency(value: Decimal) -> Decimal {
    round_half_up(value, 0)
}

/// Rounds a percentage to one decimal place.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use agro_core::calculations::common::round_percent;
///
/// assert_eq!(round_percent(dec!(85.927)), dec!(85.9));
/// ```
pub fn round_percent(value: Decimal) -> Decimal {
    round_half_up(value, 1)
}

/// Clamps a value to zero from below.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use agro_core::calculations::common::non_negative;
///
/// assert_eq!(non_negative(dec!(-5.00)), dec!(0));
/// assert_eq!(non_negative(dec!(5.00)), dec!(5.00));
/// ```
pub fn non_negative(value: Decimal) -> Decimal {
    if value.is_sign_negative() && !value.is_zero() {
        Decimal::ZERO
    } else {
        value
    }
}

/// Clamps a value into the closed range `[lower, upper]`.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use agro_core::calculations::common::clamp;
///
/// assert_eq!(clamp(dec!(55), dec!(0), dec!(40)), dec!(40));
/// assert_eq!(clamp(dec!(-1), dec!(0), dec!(40)), dec!(0));
/// assert_eq!(clamp(dec!(12.5), dec!(0), dec!(40)), dec!(12.5));
/// ```
pub fn clamp(
    value: Decimal,
    lower: Decimal,
    upper: Decimal,
) -> Decimal {
    value.max(lower).min(upper)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // round_half_up tests
    // =========================================================================

    #[test]
    fn round_half_up_rounds_down_below_midpoint() {
        let result = round_half_up(dec!(123.454), 2);

        assert_eq!(result, dec!(123.45));
    }

    #[test]
    fn round_half_up_rounds_up_at_midpoint() {
        let result = round_half_up(dec!(123.455), 2);

        assert_eq!(result, dec!(123.46));
    }

    #[test]
    fn round_half_up_handles_negative_values() {
        let result = round_half_up(dec!(-123.455), 2);

        assert_eq!(result, dec!(-123.46)); // Away from zero
    }

    #[test]
    fn round_half_up_to_whole_units() {
        let result = round_half_up(dec!(1499999.5), 0);

        assert_eq!(result, dec!(1500000));
    }

    // =========================================================================
    // round_currency / round_percent tests
    // =========================================================================

    #[test]
    fn round_currency_drops_fraction() {
        assert_eq!(round_currency(dec!(115900.49)), dec!(115900));
        assert_eq!(round_currency(dec!(115900.50)), dec!(115901));
    }

    #[test]
    fn round_percent_keeps_one_decimal() {
        assert_eq!(round_percent(dec!(-12.34)), dec!(-12.3));
        assert_eq!(round_percent(dec!(6.45)), dec!(6.5));
    }

    // =========================================================================
    // non_negative / clamp tests
    // =========================================================================

    #[test]
    fn non_negative_passes_zero_and_positive() {
        assert_eq!(non_negative(dec!(0)), dec!(0));
        assert_eq!(non_negative(dec!(0.01)), dec!(0.01));
    }

    #[test]
    fn non_negative_floors_negative_values() {
        assert_eq!(non_negative(dec!(-0.01)), Decimal::ZERO);
    }

    #[test]
    fn clamp_handles_bounds_exactly() {
        assert_eq!(clamp(dec!(0), dec!(0), dec!(40)), dec!(0));
        assert_eq!(clamp(dec!(40), dec!(0), dec!(40)), dec!(40));
    }
}
