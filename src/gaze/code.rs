//! Discrete gaze codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vertical gaze class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YClass {
    Up,
    Straight,
    Down,
}

impl YClass {
    pub fn as_char(self) -> char {
        match self {
            Self::Up => 'u',
            Self::Straight => 's',
            Self::Down => 'd',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'u' => Some(Self::Up),
            's' => Some(Self::Straight),
            'd' => Some(Self::Down),
            _ => None,
        }
    }
}

/// Depth gaze class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZClass {
    Near,
    Far,
}

impl ZClass {
    pub fn as_char(self) -> char {
        match self {
            Self::Near => 'c',
            Self::Far => 'f',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'c' => Some(Self::Near),
            'f' => Some(Self::Far),
            _ => None,
        }
    }
}

/// Where the eye should look: horizontal bucket, vertical and depth class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GazeCode {
    pub x: u32,
    pub y: YClass,
    pub z: ZClass,
}

impl GazeCode {
    pub const fn new(x: u32, y: YClass, z: ZClass) -> Self {
        Self { x, y, z }
    }

    /// Looking straight ahead at the middle bucket
    pub fn centered(buckets: u32) -> Self {
        Self::new(buckets.saturating_sub(1) / 2, YClass::Straight, ZClass::Near)
    }

    pub fn with_x(self, x: u32) -> Self {
        Self { x, ..self }
    }

    /// Horizontal distance between two codes in buckets
    pub fn x_distance(&self, other: &GazeCode) -> u32 {
        self.x.abs_diff(other.x)
    }

    /// True when one code looks down and the other does not
    pub fn vertical_flip(&self, other: &GazeCode) -> bool {
        (self.y == YClass::Down) != (other.y == YClass::Down)
    }
}

/// Renders the asset stem, e.g. `bt_12_cs`
impl fmt::Display for GazeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bt_{}_{}{}", self.x, self.z.as_char(), self.y.as_char())
    }
}

/// A gaze code as emitted once per frame, tagged with whether it belongs to
/// a different target than the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazeUpdate {
    pub code: GazeCode,
    pub is_new_target: bool,
}

impl GazeUpdate {
    pub fn new(code: GazeCode, is_new_target: bool) -> Self {
        Self {
            code,
            is_new_target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let code = GazeCode::new(12, YClass::Down, ZClass::Far);
        assert_eq!(code.to_string(), "bt_12_fd");
    }

    #[test]
    fn test_centered() {
        assert_eq!(GazeCode::centered(41).x, 20);
        assert_eq!(GazeCode::centered(1).x, 0);
    }

    #[test]
    fn test_vertical_flip() {
        let up = GazeCode::new(3, YClass::Up, ZClass::Near);
        let straight = GazeCode::new(3, YClass::Straight, ZClass::Near);
        let down = GazeCode::new(3, YClass::Down, ZClass::Near);
        assert!(up.vertical_flip(&down));
        assert!(down.vertical_flip(&straight));
        assert!(!up.vertical_flip(&straight));
    }
}
