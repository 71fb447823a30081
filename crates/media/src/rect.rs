//! Resolution-independent edit coordinates and their textual wire format.
//!
//! Blur regions travel as `"l,t,r,b;l,t,r,b;..."` with each component a
//! fraction of the frame. Parsing happens once at the boundary; everything
//! downstream only sees validated [`NormalizedRect`]s.

use {
    std::{fmt, str::FromStr},
    tracing::debug,
};

/// A rectangle in `[0,1]` fractional coordinates.
///
/// Invariant: `0 <= left < right <= 1` and `0 <= top < bottom <= 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRect {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl NormalizedRect {
    /// Build a rect, clamping each component to `[0,1]`.
    ///
    /// Returns `None` for non-finite components or when the clamped rect has
    /// no area.
    #[must_use]
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Option<Self> {
        if ![left, top, right, bottom].iter().all(|v| v.is_finite()) {
            return None;
        }
        let (left, top, right, bottom) = (
            left.clamp(0.0, 1.0),
            top.clamp(0.0, 1.0),
            right.clamp(0.0, 1.0),
            bottom.clamp(0.0, 1.0),
        );
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    #[must_use]
    pub fn left(&self) -> f64 {
        self.left
    }

    #[must_use]
    pub fn top(&self) -> f64 {
        self.top
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.right
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.bottom
    }
}

impl fmt::Display for NormalizedRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.left, self.top, self.right, self.bottom)
    }
}

impl FromStr for NormalizedRect {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let &[l, t, r, b] = parts.as_slice() else {
            return Err(crate::Error::message(format!(
                "expected 4 components, got {}",
                parts.len()
            )));
        };
        let num = |v: &str| {
            v.parse::<f64>()
                .map_err(|e| crate::Error::message(format!("invalid component {v:?}: {e}")))
        };
        Self::new(num(l)?, num(t)?, num(r)?, num(b)?)
            .ok_or_else(|| crate::Error::message(format!("degenerate rect: {s}")))
    }
}

/// Parse the `;`-separated wire format, dropping malformed or degenerate
/// entries. Never fails.
#[must_use]
pub fn parse_rects(input: &str) -> Vec<NormalizedRect> {
    input
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse::<NormalizedRect>() {
            Ok(rect) => Some(rect),
            Err(e) => {
                debug!(entry, error = %e, "dropping blur rect");
                None
            },
        })
        .collect()
}

/// Inverse of [`parse_rects`] for valid input.
#[must_use]
pub fn serialize_rects(rects: &[NormalizedRect]) -> String {
    rects
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

/// Normalized watermark position; `(0,0)` is top-left, `(1,1)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    x: f64,
    y: f64,
}

impl Anchor {
    /// Clamp both coordinates into `[0,1]`; non-finite values fall back to
    /// the bottom-right corner.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        let fix = |v: f64| {
            if v.is_finite() {
                v.clamp(0.0, 1.0)
            } else {
                1.0
            }
        };
        Self { x: fix(x), y: fix(y) }
    }

    #[must_use]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[must_use]
    pub fn y(&self) -> f64 {
        self.y
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

impl FromStr for Anchor {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let Some((x, y)) = s.split_once(',') else {
            return Err(crate::Error::message(format!("expected x,y anchor: {s}")));
        };
        let num = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| crate::Error::message(format!("invalid anchor {v:?}: {e}")))
        };
        Ok(Self::new(num(x)?, num(y)?))
    }
}
