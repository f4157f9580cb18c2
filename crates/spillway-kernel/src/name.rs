//! Channel-name structure.
//!
//! Challenge channels are named `group[-subgroup]-leaf`, where `group` is
//! the event the channel belongs to and `subgroup` its challenge category.
//! `-` is the only structural delimiter; every component is sanitized so
//! it never contains one, except the leaf which absorbs any surplus.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::NameError;

/// Structural delimiter between name components.
pub const DELIMITER: char = '-';

/// Platform limit on channel name length, in characters.
pub const MAX_CHANNEL_NAME_LEN: usize = 100;

fn emoji_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<a?:.+?:\d+?>").expect("emoji regex must compile"))
}

fn underscore_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_+").expect("underscore regex must compile"))
}

const STRIPPED: &str = "!\"#$%&'()*+,./:;<=>?@[\\]^`{|}~";

/// Parsed `(group, subgroup?, leaf)` components of a channel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelNameKey {
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgroup: Option<String>,
    pub leaf: String,
}

impl ChannelNameKey {
    /// Parse a channel name.
    ///
    /// Exactly one `-` yields `(group, leaf)`. Two or more split on the
    /// first two occurrences; the leaf keeps everything after the second.
    pub fn parse(name: &str) -> Result<Self, NameError> {
        let mut parts = name.splitn(3, DELIMITER);
        let group = parts.next().unwrap_or_default();
        let (Some(second), third) = (parts.next(), parts.next()) else {
            return Err(NameError::MissingDelimiter {
                name: name.to_string(),
            });
        };

        Ok(match third {
            None => Self {
                group: group.to_string(),
                subgroup: None,
                leaf: second.to_string(),
            },
            Some(leaf) => Self {
                group: group.to_string(),
                subgroup: Some(second.to_string()),
                leaf: leaf.to_string(),
            },
        })
    }

    /// Prefix shared by every channel of the same group: `group-`.
    pub fn group_prefix(&self) -> String {
        format!("{}{DELIMITER}", self.group)
    }

    /// Prefix shared by every channel of the same subgroup:
    /// `group-subgroup-`. `None` when the name has no subgroup.
    pub fn subgroup_prefix(&self) -> Option<String> {
        self.subgroup
            .as_ref()
            .map(|sub| format!("{}{DELIMITER}{sub}{DELIMITER}", self.group))
    }
}

/// Parse a channel name into its components.
pub fn parse_name(name: &str) -> Result<ChannelNameKey, NameError> {
    ChannelNameKey::parse(name)
}

/// Number of structural delimiters in a raw name.
pub fn delimiter_count(name: &str) -> usize {
    name.matches(DELIMITER).count()
}

/// Normalize free-form user input into a single name component.
///
/// Custom emoji tokens are removed, punctuation is dropped, spaces and `-`
/// become `_`, and the result is lowercased with `_` runs collapsed.
pub fn sanitize_channel_name(raw: &str) -> String {
    let without_emoji = emoji_token_re().replace_all(raw, "");
    let mapped: String = without_emoji
        .chars()
        .filter(|c| !STRIPPED.contains(*c))
        .map(|c| match c {
            ' ' | DELIMITER => '_',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect();
    underscore_run_re()
        .replace_all(&mapped, "_")
        .trim_matches('_')
        .to_string()
}

/// Build a challenge channel name from raw event, optional category and
/// challenge strings. Components are sanitized before joining, and the
/// result is cut to [`MAX_CHANNEL_NAME_LEN`] characters.
pub fn compose_challenge_name(event: &str, category: Option<&str>, challenge: &str) -> String {
    let mut parts = vec![sanitize_channel_name(event)];
    if let Some(category) = category.map(sanitize_channel_name).filter(|c| !c.is_empty()) {
        parts.push(category);
    }
    parts.push(sanitize_channel_name(challenge));

    parts
        .join(&DELIMITER.to_string())
        .chars()
        .take(MAX_CHANNEL_NAME_LEN)
        .collect()
}
