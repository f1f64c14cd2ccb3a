//! Gaze token wire format
//!
//! Current tokens are `v1|bt_<x>_<z><y>|<new|old>`, e.g. `v1|bt_12_cs|new`.
//! The older unversioned form `bt_<x>_<z><y>o.jpg|new` (and its `True` /
//! `False` flag variant) is still accepted when decoding.

use crate::error::TransportError;
use crate::gaze::code::{GazeCode, GazeUpdate, YClass, ZClass};

/// Version tag written on every token
pub const TOKEN_VERSION: &str = "v1";

/// Render an update as a wire token
pub fn encode(update: &GazeUpdate) -> String {
    let flag = if update.is_new_target { "new" } else { "old" };
    format!("{}|{}|{}", TOKEN_VERSION, update.code, flag)
}

fn malformed(token: &str, reason: &str) -> TransportError {
    TransportError::MalformedToken {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a wire token, accepting both versioned and legacy forms
pub fn decode(token: &str) -> Result<GazeUpdate, TransportError> {
    let trimmed = token.trim();
    let parts: Vec<&str> = trimmed.split('|').collect();

    let (code_part, flag_part) = match parts.as_slice() {
        [version, code, flag] => {
            if *version != TOKEN_VERSION {
                return Err(malformed(token, "unsupported token version"));
            }
            (*code, *flag)
        }
        [filename, flag] => (strip_legacy_suffix(filename), *flag),
        _ => return Err(malformed(token, "expected 2 or 3 '|' separated fields")),
    };

    let is_new_target = match flag_part {
        "new" | "True" => true,
        "old" | "False" => false,
        _ => return Err(malformed(token, "unknown new-target flag")),
    };

    let code = parse_code(code_part).ok_or_else(|| malformed(token, "bad gaze code"))?;
    Ok(GazeUpdate::new(code, is_new_target))
}

/// `bt_12_cso.jpg` -> `bt_12_cs`
fn strip_legacy_suffix(filename: &str) -> &str {
    let stem = filename.strip_suffix(".jpg").unwrap_or(filename);
    // A legacy stem carries a trailing lid character after the two class chars
    match stem.rsplit_once('_') {
        Some((_, classes)) if classes.chars().count() == 3 => stem
            .char_indices()
            .last()
            .map_or(stem, |(i, _)| &stem[..i]),
        _ => stem,
    }
}

/// Parse `bt_<x>_<z><y>`
pub fn parse_code(stem: &str) -> Option<GazeCode> {
    let rest = stem.strip_prefix("bt_")?;
    let (x, classes) = rest.split_once('_')?;
    let x: u32 = x.parse().ok()?;

    let mut chars = classes.chars();
    let z = ZClass::from_char(chars.next()?)?;
    let y = YClass::from_char(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }

    Some(GazeCode::new(x, y, z))
}
