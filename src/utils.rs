//! Utility functions for the ember-mug-ble crate.

/// Round a value to a fixed number of decimal places.
///
/// # Arguments
///
/// * `value` - The value to round
/// * `decimals` - Number of digits to keep after the decimal point
///
/// # Example
///
/// ```
/// use ember_mug_ble::round_to;
///
/// assert_eq!(round_to(18.010000000000002, 2), 18.01);
/// ```
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Convert Celsius to Fahrenheit.
///
/// # Example
///
/// ```
/// use ember_mug_ble::celsius_to_fahrenheit;
///
/// let fahrenheit = celsius_to_fahrenheit(100.0);
/// assert!((fahrenheit - 212.0).abs() < 0.001);
/// ```
#[inline]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}
