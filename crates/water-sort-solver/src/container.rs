//! A single 4-layer bottle packed into two bytes.
//!
//! Layers are addressed top-first: layer 0 is the open end, layer 3 the
//! bottom. Layer `2k` lives in the high nibble of byte `k`, layer `2k + 1`
//! in the low nibble.

use std::fmt;

use crate::color::{layer_code, Color};
use crate::error::DealError;

/// Number of layers in every container
pub const LAYERS: usize = 4;

/// Bytes used by one packed container
pub const CONTAINER_BYTES: usize = 2;

const LOW_NIBBLE: u8 = 0b0000_1111;
const HIGH_NIBBLE: u8 = 0b1111_0000;

/// A bottle holding up to [`LAYERS`] units of liquid.
///
/// Invariant: liquid never floats. If layer `k` is empty, every layer above
/// it (index `< k`) is empty too.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Container {
    packed: [u8; CONTAINER_BYTES],
}

impl Container {
    /// A container with all layers empty
    pub const fn empty() -> Self {
        Self {
            packed: [0; CONTAINER_BYTES],
        }
    }

    /// Build a container from its layers, top first.
    pub fn from_layers(layers: [Option<Color>; LAYERS]) -> Result<Self, DealError> {
        let first_filled = layers.iter().position(Option::is_some).unwrap_or(LAYERS);
        if let Some(hole) = (first_filled..LAYERS).find(|&i| layers[i].is_none()) {
            return Err(DealError::FloatingLiquid {
                layer: hole,
                layers,
            });
        }

        let mut container = Self::empty();
        for (i, layer) in layers.into_iter().enumerate() {
            container.set_layer(i, layer);
        }
        Ok(container)
    }

    /// A container holding four units of one color
    pub fn full_of(color: Color) -> Self {
        let code = color.code();
        let byte = (code << 4) | code;
        Self {
            packed: [byte, byte],
        }
    }

    /// The color stored at `layer` (`None` when empty).
    ///
    /// Panics if `layer >= LAYERS`.
    pub fn layer(&self, layer: usize) -> Option<Color> {
        assert!(layer < LAYERS, "layer index {layer} out of range");
        let byte = self.packed[layer / 2];
        let code = if layer % 2 == 0 {
            byte >> 4
        } else {
            byte & LOW_NIBBLE
        };
        Color::from_code(code)
    }

    /// Overwrite a single layer. Does not check the no-floating invariant;
    /// callers move liquid top-down so it holds after every complete pour.
    ///
    /// Panics if `layer >= LAYERS`.
    pub fn set_layer(&mut self, layer: usize, color: Option<Color>) {
        assert!(layer < LAYERS, "layer index {layer} out of range");
        let code = layer_code(color);
        let byte = &mut self.packed[layer / 2];
        if layer % 2 == 0 {
            *byte = (*byte & LOW_NIBBLE) | (code << 4);
        } else {
            *byte = (*byte & HIGH_NIBBLE) | code;
        }
    }

    /// All four layers, top first
    pub fn layers(&self) -> [Option<Color>; LAYERS] {
        std::array::from_fn(|i| self.layer(i))
    }

    /// The raw packed bytes
    pub fn bytes(&self) -> [u8; CONTAINER_BYTES] {
        self.packed
    }

    /// True if the topmost layer is empty
    pub fn has_free_space(&self) -> bool {
        self.layer(0).is_none()
    }

    /// True if the bottom layer is empty, which means all layers are
    pub fn is_empty(&self) -> bool {
        self.layer(LAYERS - 1).is_none()
    }

    /// True if empty, or full of a single color
    pub fn is_complete(&self) -> bool {
        if self.is_empty() {
            return true;
        }
        if self.has_free_space() {
            return false;
        }
        let bottom = self.layer(LAYERS - 1);
        (0..LAYERS - 1).all(|i| self.layer(i) == bottom)
    }

    /// The first non-empty color scanning from the top
    pub fn top(&self) -> Option<Color> {
        self.top_with_layer().0
    }

    /// The top color together with its layer index.
    ///
    /// The index equals the number of free layers above the liquid, and is
    /// `LAYERS` when the container is empty.
    pub fn top_with_layer(&self) -> (Option<Color>, usize) {
        for i in 0..LAYERS {
            if let Some(color) = self.layer(i) {
                return (Some(color), i);
            }
        }
        (None, LAYERS)
    }

    /// Length of the contiguous run of the top color
    pub fn top_run(&self) -> usize {
        let (color, start) = self.top_with_layer();
        match color {
            None => 0,
            Some(c) => (start..LAYERS)
                .take_while(|&i| self.layer(i) == Some(c))
                .count(),
        }
    }

    /// Whether pouring into `other` is a legal move worth making.
    ///
    /// Into an empty container any non-empty source may pour. Otherwise the
    /// top colors must match and the whole top run must fit into `other`.
    pub fn should_pour_to(&self, other: &Container) -> bool {
        if self.is_empty() || !other.has_free_space() {
            return false;
        }
        if other.is_empty() {
            return true;
        }
        let (color, _) = self.top_with_layer();
        let (other_color, free) = other.top_with_layer();
        if color != other_color {
            return false;
        }
        self.top_run() <= free
    }

    /// Pour the top run into `other` as far as space allows.
    ///
    /// Returns the poured color, or `None` when nothing could be poured
    /// because the top colors conflict or `self` is empty.
    pub fn pour(&mut self, other: &mut Container) -> Option<Color> {
        let (color, start) = self.top_with_layer();
        let color = color?;
        let (other_top, free) = other.top_with_layer();

        // Destination layer for the i-th unit moved
        let target = |i: usize| -> usize {
            match other_top {
                None => LAYERS - 1 - i,
                Some(_) => free - i - 1,
            }
        };

        if other_top.is_some_and(|c| c != color) {
            return None;
        }

        let mut i = 0;
        while start + i < LAYERS && self.layer(start + i) == Some(color) && other.has_free_space() {
            self.set_layer(start + i, None);
            other.set_layer(target(i), Some(color));
            i += 1;
        }
        Some(color)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.layers()).finish()
    }
}
