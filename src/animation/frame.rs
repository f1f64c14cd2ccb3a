//! Displayed eye frames

use serde::{Deserialize, Serialize};

use crate::gaze::code::{GazeCode, YClass, ZClass};

/// Eyelid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lid {
    Open,
    Half,
    Closed,
}

impl Lid {
    pub fn as_char(self) -> char {
        match self {
            Self::Open => 'o',
            Self::Half => 'h',
            Self::Closed => 'c',
        }
    }
}

/// Which part of the engine produced a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSource {
    /// A gaze update from the tracker
    Live,
    Blink,
    Jitter,
    /// Dozing off or a wake glance; never a real external update
    Sleep,
}

/// One frame handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeFrame {
    pub code: GazeCode,
    pub lid: Lid,
    pub source: FrameSource,
}

impl EyeFrame {
    pub fn new(code: GazeCode, lid: Lid, source: FrameSource) -> Self {
        Self { code, lid, source }
    }

    pub fn open(code: GazeCode, source: FrameSource) -> Self {
        Self::new(code, Lid::Open, source)
    }

    pub fn half(code: GazeCode, source: FrameSource) -> Self {
        Self::new(code, Lid::Half, source)
    }

    pub fn closed(code: GazeCode, source: FrameSource) -> Self {
        Self::new(code, Lid::Closed, source)
    }

    /// Primary asset file name, e.g. `bt_20_cso.jpg`
    pub fn asset_key(&self) -> String {
        format!("{}{}.jpg", self.code, self.lid.as_char())
    }

    /// Asset names to try in order. Closed-lid artwork only exists for a
    /// subset of codes, so closed frames fall back to the straight and then
    /// the near/straight variant at the same bucket.
    pub fn asset_candidates(&self) -> Vec<String> {
        let mut candidates = vec![self.asset_key()];
        if self.lid == Lid::Closed {
            for code in [
                GazeCode::new(self.code.x, YClass::Straight, self.code.z),
                GazeCode::new(self.code.x, YClass::Straight, ZClass::Near),
            ] {
                let key = format!("{}{}.jpg", code, Lid::Closed.as_char());
                if !candidates.contains(&key) {
                    candidates.push(key);
                }
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_key() {
        let frame = EyeFrame::half(
            GazeCode::new(20, YClass::Straight, ZClass::Near),
            FrameSource::Blink,
        );
        assert_eq!(frame.asset_key(), "bt_20_csh.jpg");
    }

    #[test]
    fn test_closed_fallback_chain() {
        let frame = EyeFrame::closed(GazeCode::new(12, YClass::Down, ZClass::Far), FrameSource::Sleep);
        assert_eq!(
            frame.asset_candidates(),
            vec!["bt_12_fdc.jpg", "bt_12_fsc.jpg", "bt_12_csc.jpg"]
        );
    }

    #[test]
    fn test_closed_fallback_deduplicates() {
        let frame = EyeFrame::closed(
            GazeCode::new(4, YClass::Straight, ZClass::Near),
            FrameSource::Blink,
        );
        assert_eq!(frame.asset_candidates(), vec!["bt_4_csc.jpg"]);
    }

    #[test]
    fn test_open_has_no_fallback() {
        let frame = EyeFrame::open(GazeCode::new(1, YClass::Up, ZClass::Far), FrameSource::Live);
        assert_eq!(frame.asset_candidates().len(), 1);
    }
}
