//! Number formatting for published values
//!
//! Integers go through `itoa` stack buffers. Floating values are always
//! rendered with exactly two fractional digits, which is what downstream
//! consumers of the flat store expect.
//!
//! ```rust
//! use nm2_store::numfmt::{i64_to_string, fixed2, kelvin_to_celsius};
//!
//! assert_eq!(i64_to_string(-42), "-42");
//! assert_eq!(fixed2(50.0), "50.00");
//! assert_eq!(kelvin_to_celsius(300.0), "26.85");
//! ```

/// Absolute zero offset used for kelvin readings
pub const KELVIN_OFFSET: f64 = 273.15;

/// Convert i64 using a stack buffer
#[inline]
pub fn i64_to_string(n: i64) -> String {
    let mut buffer = itoa::Buffer::new();
    buffer.format(n).to_string()
}

/// Convert u64 using a stack buffer
#[inline]
pub fn u64_to_string(n: u64) -> String {
    let mut buffer = itoa::Buffer::new();
    buffer.format(n).to_string()
}

/// Two fractional digits, no exponent
#[inline]
pub fn fixed2(n: f64) -> String {
    format!("{:.2}", n)
}

/// Kelvin reading to a two-digit Celsius string
#[inline]
pub fn kelvin_to_celsius(kelvin: f64) -> String {
    fixed2(kelvin - KELVIN_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers() {
        assert_eq!(i64_to_string(0), "0");
        assert_eq!(i64_to_string(i64::MIN), "-9223372036854775808");
        assert_eq!(u64_to_string(u64::MAX), "18446744073709551615");
    }

    #[test]
    fn test_fixed2() {
        assert_eq!(fixed2(230.0), "230.00");
        assert_eq!(fixed2(49.987), "49.99");
        assert_eq!(fixed2(-3.5), "-3.50");
    }

    #[test]
    fn test_kelvin_to_celsius() {
        assert_eq!(kelvin_to_celsius(300.0), "26.85");
        assert_eq!(kelvin_to_celsius(273.15), "0.00");
        assert_eq!(kelvin_to_celsius(263.15), "-10.00");
    }
}
