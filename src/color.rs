use serde::{Deserialize, Serialize};

use crate::foundation::error::{SheetError, SheetResult};

/// Straight-alpha RGBA colour used to initialise the sheet canvas.
///
/// Alpha 0 is a fully transparent base, 255 an opaque one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BackgroundSpec {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl BackgroundSpec {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB` (opaque) or `#RRGGBBAA`. The leading `#` is optional.
    pub fn parse_hex(s: &str) -> SheetResult<Self> {
        let s = s.trim();
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(SheetError::validation(format!(
                "background color must be #RRGGBB or #RRGGBBAA, got '{s}'"
            )));
        }

        let byte = |i: usize| -> SheetResult<u8> {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| SheetError::validation(format!("invalid hex digits in '{s}'")))
        };

        let a = if hex.len() == 8 { byte(6)? } else { 255 };
        Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, a))
    }

    /// Lenient parse: anything that is not a valid hex colour becomes transparent black.
    pub fn parse_or_transparent(s: &str) -> Self {
        Self::parse_hex(s).unwrap_or(Self::TRANSPARENT)
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// `#RRGGBBAA` form, always eight digits.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

impl std::str::FromStr for BackgroundSpec {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl Serialize for BackgroundSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BackgroundSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            Arr(Vec<u8>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => Ok(Self::parse_or_transparent(&s)),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self::rgba(*r, *g, *b, 255)),
                [r, g, b, a] => Ok(Self::rgba(*r, *g, *b, *a)),
                _ => Err(serde::de::Error::custom(
                    "rgba array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}
