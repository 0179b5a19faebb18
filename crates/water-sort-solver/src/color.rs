//! Liquid colors and their 4-bit codes.
//!
//! A layer is an `Option<Color>`: `None` is the empty nibble (code 0),
//! every palette entry maps to one of the codes 1..=15.

use serde::{Deserialize, Serialize};

/// One of the 15 liquid colors - the discriminant is the packed nibble value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    Black = 1,
    Brown = 2,
    Grey = 3,
    Yellow = 4,
    Cyan = 5,
    Magenta = 6,
    Lime = 7,
    Purple = 8,
    Green = 9,
    Emerald = 10,
    White = 11,
    Blue = 12,
    Orange = 13,
    Pink = 14,
    Red = 15,
}

/// Number of distinct liquid colors
pub const TOTAL_COLORS: usize = 15;

impl Color {
    /// Every color in code order
    pub const ALL: [Color; TOTAL_COLORS] = [
        Color::Black,
        Color::Brown,
        Color::Grey,
        Color::Yellow,
        Color::Cyan,
        Color::Magenta,
        Color::Lime,
        Color::Purple,
        Color::Green,
        Color::Emerald,
        Color::White,
        Color::Blue,
        Color::Orange,
        Color::Pink,
        Color::Red,
    ];

    /// The nibble stored in a container
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a nibble. Code 0 (empty) and anything above 15 yield `None`.
    pub fn from_code(code: u8) -> Option<Color> {
        match code {
            1..=15 => Some(Color::ALL[(code - 1) as usize]),
            _ => None,
        }
    }

    /// Fixed-width label used by the grid renderer
    pub fn label(self) -> &'static str {
        match self {
            Color::Black => "BLACK  ",
            Color::Brown => "BROWN  ",
            Color::Grey => "GREY   ",
            Color::Yellow => "YELLOW ",
            Color::Cyan => "CYAN   ",
            Color::Magenta => "MAGENTA",
            Color::Lime => "LIME   ",
            Color::Purple => "PURPLE ",
            Color::Green => "GREEN  ",
            Color::Emerald => "EMERALD",
            Color::White => "WHITE  ",
            Color::Blue => "BLUE   ",
            Color::Orange => "ORANGE ",
            Color::Pink => "PINK   ",
            Color::Red => "RED    ",
        }
    }
}

/// Packed code of a layer, 0 for empty
pub fn layer_code(layer: Option<Color>) -> u8 {
    layer.map_or(0, Color::code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_palette() {
        for (i, color) in Color::ALL.iter().enumerate() {
            assert_eq!(color.code() as usize, i + 1);
            assert_eq!(Color::from_code(color.code()), Some(*color));
        }
        assert_eq!(Color::from_code(0), None);
        assert_eq!(Color::from_code(16), None);
    }

    #[test]
    fn test_labels_have_fixed_width() {
        assert!(Color::ALL.iter().all(|c| c.label().len() == 7));
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Color::Emerald).unwrap();
        assert_eq!(json, "\"emerald\"");
        let back: Color = serde_json::from_str("\"red\"").unwrap();
        assert_eq!(back, Color::Red);
    }
}
