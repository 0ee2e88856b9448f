//! src/message.rs
//!
//! Parsing of tagged `PRIVMSG` lines into [`ChatMessage`] plus the values
//! derived from a message's tags (badges, display name, colors).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use twitchbot_common::models::Config;

/// Marker a client puts in front of a `/me` message body.
pub const ACTION_PREFIX: &str = "\x01ACTION ";

/// The one wire shape that is a chat message: tags, sender prefix,
/// `PRIVMSG #channel`, body.
pub(crate) static MSG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^@(?P<info>[^ ]+) :(?P<user>[^!]+).* PRIVMSG #(?P<channel>[^ ]+) :(?P<msg>[^\r]+)",
    )
    .expect("static message regex")
});

const HIGHLIGHT_BG: Rgb = Rgb(117, 94, 188);
const REWARD_BG: Rgb = Rgb(29, 91, 130);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parses `#RRGGBB`. Anything else is `None`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Rgb(r, g, b))
    }

    /// Deterministic color for users who never picked one.
    ///
    /// Takes the first 8 bytes of the SHA-256 of `name` as a little-endian
    /// u64, then reads its binary digits from the most significant set bit:
    /// each channel is `bit * 127 + (next_bit << 7)`, six bits in total.
    pub fn generate(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let n = u64::from_le_bytes(prefix);

        let width = 64 - n.leading_zeros();
        let bit = |i: u32| -> u16 {
            if i < width {
                ((n >> (width - 1 - i)) & 1) as u16
            } else {
                0
            }
        };
        let channel = |i: u32| (bit(i) * 0b111_1111 + (bit(i + 1) << 7)) as u8;

        Rgb(channel(0), channel(2), channel(4))
    }
}

/// One inbound chat line, parsed. Built once per line and dropped after
/// its dispatch cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub text: String,
    pub is_action: bool,
    pub channel: String,
    /// Login name from the line prefix.
    pub sender: String,
    pub tags: HashMap<String, String>,
}

impl ChatMessage {
    /// Returns `None` for anything that is not a tagged channel message
    /// (PING, numerics, JOIN acknowledgements, ...).
    pub fn parse(line: &str) -> Option<Self> {
        let caps = MSG_RE.captures(line)?;

        let body = &caps["msg"];
        let (text, is_action) = match body.strip_prefix(ACTION_PREFIX) {
            Some(rest) => (rest.strip_suffix('\x01').unwrap_or(rest), true),
            None => (body, false),
        };

        Some(Self {
            text: text.to_string(),
            is_action,
            channel: caps["channel"].to_string(),
            sender: caps["user"].to_string(),
            tags: parse_tags(&caps["info"]),
        })
    }

    /// Placeholder message used when a handler runs on a timer instead of
    /// in response to chat.
    pub fn synthetic(config: &Config, text: &str) -> Self {
        let mut tags = HashMap::new();
        tags.insert("badges".to_string(), String::new());
        tags.insert("color".to_string(), String::new());
        tags.insert("display-name".to_string(), config.username.clone());
        Self {
            text: text.to_string(),
            is_action: false,
            channel: config.channel.clone(),
            sender: config.username.clone(),
            tags,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn badges(&self) -> Vec<&str> {
        self.tag("badges")
            .unwrap_or_default()
            .split(',')
            .filter(|b| !b.is_empty())
            .collect()
    }

    pub fn display_name(&self) -> &str {
        match self.tag("display-name") {
            Some(name) if !name.is_empty() => name,
            _ => &self.sender,
        }
    }

    /// Lowercased display name, used for equality checks.
    pub fn name_key(&self) -> String {
        self.display_name().to_lowercase()
    }

    pub fn color(&self) -> Rgb {
        self.tag("color")
            .and_then(Rgb::from_hex)
            .unwrap_or_else(|| Rgb::generate(self.display_name()))
    }

    pub fn bg_color(&self) -> Option<Rgb> {
        if self.tag("msg-id") == Some("highlighted-message") {
            Some(HIGHLIGHT_BG)
        } else if self.tag("custom-reward-id").is_some_and(|id| !id.is_empty()) {
            Some(REWARD_BG)
        } else {
            None
        }
    }

    /// The `bits` tag as a number, if present and well formed.
    pub fn bits(&self) -> Option<u64> {
        self.tag("bits").and_then(|b| b.trim().parse().ok())
    }
}

/// Splits `k=v;k2=v2`. A value may be empty; a part without `=` counts as
/// a present key with an empty value.
pub fn parse_tags(info: &str) -> HashMap<String, String> {
    info.split(';')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (part.to_string(), String::new()),
        })
        .collect()
}
