use std::{
    fmt,
    ops::{Add, Div, Mul, Neg, Sub},
};

/// An absolute length, stored in typographic points.
///
/// Literal units are converted on construction: `1mm` is `2.83465pt`, `1cm`
/// is `28.3465pt`, and `1in` is `72pt`.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct Length {
    /// The length in points.
    pub pt: f64,
}

impl Length {
    /// The zero length.
    pub const fn zero() -> Self {
        Self { pt: 0.0 }
    }

    /// Creates a length from a value in points.
    pub const fn pt(pt: f64) -> Self {
        Self { pt }
    }

    /// Creates a length from a value in millimeters.
    pub fn mm(mm: f64) -> Self {
        Self { pt: mm * 2.83465 }
    }

    /// Creates a length from a value in centimeters.
    pub fn cm(cm: f64) -> Self {
        Self { pt: cm * 28.3465 }
    }

    /// Creates a length from a value in inches.
    pub fn inches(inches: f64) -> Self {
        Self { pt: inches * 72.0 }
    }

    /// Whether the length is zero.
    pub fn is_zero(self) -> bool {
        self.pt == 0.0
    }
}

/// An angle, stored in radians.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct Angle {
    /// The angle in radians.
    pub rad: f64,
}

impl Angle {
    /// Creates an angle from a value in radians.
    pub const fn rad(rad: f64) -> Self {
        Self { rad }
    }

    /// Creates an angle from a value in degrees.
    pub fn deg(deg: f64) -> Self {
        Self { rad: deg * std::f64::consts::PI / 180.0 }
    }

    /// The angle in degrees.
    pub fn to_deg(self) -> f64 {
        self.rad * 180.0 / std::f64::consts::PI
    }
}

/// A ratio of a whole, where `1.0` means `100%`.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio {
    /// The fraction of the whole.
    pub value: f64,
}

impl Ratio {
    /// The zero ratio.
    pub const fn zero() -> Self {
        Self { value: 0.0 }
    }

    /// Creates a ratio from a fraction, where `1.0` is `100%`.
    pub const fn new(value: f64) -> Self {
        Self { value }
    }

    /// Creates a ratio from a percentage.
    pub fn percent(percent: f64) -> Self {
        Self { value: percent / 100.0 }
    }

    /// Whether the ratio is zero.
    pub fn is_zero(self) -> bool {
        self.value == 0.0
    }
}

/// A length relative to some unknown whole: the sum of an absolute part and a
/// proportional part.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Rel {
    /// The absolute part.
    pub abs: Length,
    /// The proportional part.
    pub ratio: Ratio,
}

impl Rel {
    /// The zero relative length.
    pub const fn zero() -> Self {
        Self { abs: Length::zero(), ratio: Ratio::zero() }
    }

    /// Creates a relative length from its parts.
    pub const fn new(abs: Length, ratio: Ratio) -> Self {
        Self { abs, ratio }
    }
}

impl From<Length> for Rel {
    fn from(abs: Length) -> Self {
        Self { abs, ratio: Ratio::zero() }
    }
}

impl From<Ratio> for Rel {
    fn from(ratio: Ratio) -> Self {
        Self { abs: Length::zero(), ratio }
    }
}

/// A fraction of remaining layout space, the `fr` unit.
///
/// Fractions are only additive with fractions and scalable by numbers.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct Fr {
    /// The number of fraction units.
    pub value: f64,
}

impl Fr {
    /// Creates a fraction from a number of units.
    pub const fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Add for Length {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { pt: self.pt + rhs.pt }
    }
}

impl Sub for Length {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { pt: self.pt - rhs.pt }
    }
}

impl Neg for Length {
    type Output = Self;
    fn neg(self) -> Self {
        Self { pt: -self.pt }
    }
}

impl Mul<f64> for Length {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self { pt: self.pt * rhs }
    }
}

impl Div<f64> for Length {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self { pt: self.pt / rhs }
    }
}

impl Add for Angle {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { rad: self.rad + rhs.rad }
    }
}

impl Sub for Angle {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { rad: self.rad - rhs.rad }
    }
}

impl Neg for Angle {
    type Output = Self;
    fn neg(self) -> Self {
        Self { rad: -self.rad }
    }
}

impl Mul<f64> for Angle {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self { rad: self.rad * rhs }
    }
}

impl Div<f64> for Angle {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self { rad: self.rad / rhs }
    }
}

impl Add for Ratio {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { value: self.value + rhs.value }
    }
}

impl Sub for Ratio {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { value: self.value - rhs.value }
    }
}

impl Neg for Ratio {
    type Output = Self;
    fn neg(self) -> Self {
        Self { value: -self.value }
    }
}

impl Mul<f64> for Ratio {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self { value: self.value * rhs }
    }
}

impl Div<f64> for Ratio {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self { value: self.value / rhs }
    }
}

impl Add for Rel {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { abs: self.abs + rhs.abs, ratio: self.ratio + rhs.ratio }
    }
}

impl Sub for Rel {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { abs: self.abs - rhs.abs, ratio: self.ratio - rhs.ratio }
    }
}

impl Neg for Rel {
    type Output = Self;
    fn neg(self) -> Self {
        Self { abs: -self.abs, ratio: -self.ratio }
    }
}

impl Mul<f64> for Rel {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self { abs: self.abs * rhs, ratio: self.ratio * rhs }
    }
}

impl Div<f64> for Rel {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self { abs: self.abs / rhs, ratio: self.ratio / rhs }
    }
}

impl Add for Fr {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { value: self.value + rhs.value }
    }
}

impl Sub for Fr {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { value: self.value - rhs.value }
    }
}

impl Neg for Fr {
    type Output = Self;
    fn neg(self) -> Self {
        Self { value: -self.value }
    }
}

impl Mul<f64> for Fr {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self { value: self.value * rhs }
    }
}

impl Div<f64> for Fr {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self { value: self.value / rhs }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    let mut buffer = ryu::Buffer::new();
    f.write_str(buffer.format(value))
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_float(f, self.pt)?;
        f.write_str("pt")
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_float(f, self.to_deg())?;
        f.write_str("deg")
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_float(f, self.value * 100.0)?;
        f.write_str("%")
    }
}

impl fmt::Display for Rel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ratio.is_zero() {
            self.abs.fmt(f)
        } else if self.abs.is_zero() {
            self.ratio.fmt(f)
        } else {
            write!(f, "{} + {}", self.abs, self.ratio)
        }
    }
}

impl fmt::Display for Fr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_float(f, self.value)?;
        f.write_str("fr")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversions() {
        assert_eq!(Length::inches(1.0).pt, 72.0);
        assert!((Length::mm(10.0).pt - 28.3465).abs() < 1e-9);
        assert_eq!(Ratio::percent(50.0).value, 0.5);
        assert!((Angle::deg(180.0).rad - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn relative_composition() {
        let rel = Rel::from(Length::pt(10.0)) + Rel::from(Ratio::percent(30.0));
        assert_eq!(rel.abs.pt, 10.0);
        assert_eq!(rel.ratio.value, 0.3);
        assert_eq!(rel.to_string(), "10.0pt + 30.0%");
    }
}
