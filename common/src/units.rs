use std::{fmt, str::FromStr, sync::LazyLock};

use bigdecimal::BigDecimal;
use regex::Regex;
use thiserror::Error;

static QUANTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.?\d*)\s*(\w?)").expect("quantity pattern"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitError {
    #[error("Invalid data size format '{0}'")]
    InvalidFormat(String),
}

/// Order of magnitude of a quantity. The discriminant is the level in the scale.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Unit {
    #[default]
    B,
    K,
    M,
    G,
    T,
    P,
    E,
    Z,
    Y,
}

impl Unit {
    pub const ALL: [Unit; 9] = [
        Unit::B,
        Unit::K,
        Unit::M,
        Unit::G,
        Unit::T,
        Unit::P,
        Unit::E,
        Unit::Z,
        Unit::Y,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Case-insensitive lookup. Anything outside the scale is treated as bytes.
    pub fn from_letter(letter: char) -> Self {
        Self::ALL
            .into_iter()
            .find(|unit| unit.letter().eq_ignore_ascii_case(&letter))
            .unwrap_or(Unit::B)
    }

    pub fn letter(self) -> char {
        match self {
            Unit::B => 'B',
            Unit::K => 'K',
            Unit::M => 'M',
            Unit::G => 'G',
            Unit::T => 'T',
            Unit::P => 'P',
            Unit::E => 'E',
            Unit::Z => 'Z',
            Unit::Y => 'Y',
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub value: BigDecimal,
    pub unit: Unit,
}

impl Quantity {
    /// Reads the first `<number>[unit]` token found in `text`, e.g. `4k`, `120.5 M` or `48.1MiB/s`.
    pub fn parse(text: &str) -> Result<Self, UnitError> {
        let caps = QUANTITY_REGEX
            .captures(text)
            .ok_or_else(|| UnitError::InvalidFormat(text.to_owned()))?;
        let value = caps
            .get(1)
            .and_then(|m| BigDecimal::from_str(m.as_str()).ok())
            .ok_or_else(|| UnitError::InvalidFormat(text.to_owned()))?;
        let unit = caps
            .get(2)
            .and_then(|m| m.as_str().chars().next())
            .map(Unit::from_letter)
            .unwrap_or_default();
        Ok(Self { value, unit })
    }

    pub fn convert(&self, target: Unit, factor: u32) -> BigDecimal {
        let step = BigDecimal::from(factor);
        let scale = |levels: usize| {
            (0..levels).fold(BigDecimal::from(1), |acc, _| acc * &step)
        };
        let (from, to) = (self.unit.index(), target.index());
        if from >= to {
            self.value.clone() * scale(from - to)
        } else {
            self.value.clone() / scale(to - from)
        }
    }
}

/// Converts `text` into `target` units where adjacent levels differ by `factor`.
///
/// The result is a plain decimal string with trailing fractional zeros removed,
/// so integral results carry no decimal point.
pub fn normalize(text: &str, target: Unit, factor: u32) -> Result<String, UnitError> {
    let quantity = Quantity::parse(text)?;
    Ok(trim_trailing_zeros(
        quantity.convert(target, factor).to_plain_string(),
    ))
}

fn trim_trailing_zeros(num: String) -> String {
    if num.contains('.') {
        num.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        num
    }
}
