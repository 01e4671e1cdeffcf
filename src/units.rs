//! Metric unit formatting for overlay readouts
//!
//! Renders a reading with an SI prefix and as many decimals as fit in a
//! fixed-width field, e.g. `12.346V`, `1.750A`, `4.700kΩ`, `14.3MHz`.

/// SI prefixes from yocto (10^-24) to yotta (10^24).
const PREFIXES: [&str; 17] = [
    "y", "z", "a", "f", "p", "n", "µ", "m", "", "k", "M", "G", "T", "P", "E", "Z", "Y",
];

/// Largest prefix step in either direction (yocto / yotta).
const MAX_EXPONENT: i32 = 8;

/// Characters available for sign, digits, decimal point, prefix and unit.
const FIELD_WIDTH: i32 = 6;

const MAX_DECIMALS: i32 = 3;

/// Metric-prefix formatter.
pub struct Metric;

impl Metric {
    /// Format `value` followed by an SI prefix and `unit`.
    pub fn format(value: f64, unit: &str) -> String {
        if value == 0.0 {
            // Covers -0.0 as well
            return format!("{:.3}{}", 0.0, unit);
        }
        if !value.is_finite() {
            return format!("{}{}", value, unit);
        }

        let exponent = ((value.abs().log10() / 3.0).trunc() as i32).clamp(-MAX_EXPONENT, MAX_EXPONENT);
        let scaled = value * 1000f64.powi(-exponent);

        // Digits left of the decimal point, minus one
        let int_digits = scaled.abs().log10().trunc() as i32;

        let decimals = FIELD_WIDTH
            - i32::from(scaled < 0.0)
            - int_digits
            - i32::from(int_digits < 4)
            - i32::from(exponent != 0)
            - unit.chars().count() as i32;
        let decimals = decimals.clamp(0, MAX_DECIMALS) as usize;

        format!(
            "{:.*}{}{}",
            decimals,
            scaled,
            PREFIXES[(exponent + MAX_EXPONENT) as usize],
            unit
        )
    }
}

/// A physical quantity with a fixed unit symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity {
    unit: &'static str,
}

impl Quantity {
    pub const fn new(unit: &'static str) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> &'static str {
        self.unit
    }

    pub fn format(&self, value: f64) -> String {
        Metric::format(value, self.unit)
    }
}

pub const VOLTAGE: Quantity = Quantity::new("V");
pub const CURRENT: Quantity = Quantity::new("A");
pub const RESISTANCE: Quantity = Quantity::new("Ω");
pub const CAPACITANCE: Quantity = Quantity::new("F");
pub const FREQUENCY: Quantity = Quantity::new("Hz");
pub const POWER: Quantity = Quantity::new("W");
