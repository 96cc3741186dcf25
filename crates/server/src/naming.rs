//! Nickname and chat sanitisation.

use crate::error::GameError;

/// Longest chat line kept after sanitising.
pub const MAX_CHAT_LENGTH: usize = 35;

/// Turns a raw handshake name into a display name, or rejects it.
pub trait NicknamePolicy: Send + Sync {
    fn sanitize(&self, raw: &str) -> Result<String, GameError>;
}

/// Strips markup, then accepts short non-empty word-character names.
#[derive(Debug)]
pub struct WordNickname {
    pub max_length: usize,
}

impl NicknamePolicy for WordNickname {
    fn sanitize(&self, raw: &str) -> Result<String, GameError> {
        let name = strip_tags(raw);
        let name = name.trim();
        let valid = !name.is_empty()
            && name.chars().count() <= self.max_length
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(name.to_string())
        } else {
            Err(GameError::InvalidNickname(raw.to_string()))
        }
    }
}

/// Remove anything that looks like an HTML tag.
pub fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                rest = &rest[open..];
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Sanitise a chat line for rebroadcast.
pub fn sanitize_chat(text: &str) -> String {
    strip_tags(text).chars().take(MAX_CHAT_LENGTH).collect()
}
