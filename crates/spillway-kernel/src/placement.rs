//! Ordinal placement of a challenge channel within a category.
//!
//! Positions are plain integers owned by the platform. Grouping is kept
//! purely through them: every top-level group starts a fresh band of
//! `band_width` positions, siblings of a group are packed right after the
//! group's last channel, and siblings of a subgroup take over the slot of
//! the subgroup's last channel.

use serde::{Deserialize, Serialize};

use crate::error::NameError;
use crate::name::{ChannelNameKey, delimiter_count};
use crate::topology::{CategorySnapshot, ChannelEntry, Position};

/// Default width of a group's position band.
pub const DEFAULT_BAND_WIDTH: Position = 1000;

/// Which rule decided an ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrdinalRule {
    /// Took over the slot of the last same-subgroup channel.
    SameSubgroup,
    /// Inserted right after the last same-group channel.
    SameGroup,
    /// Opened a new band after the last child.
    NewBand,
    /// Category was empty.
    Empty,
}

/// An ordinal together with the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordinal {
    pub position: Position,
    pub rule: OrdinalRule,
}

/// Last children matching the new name's subgroup and group.
#[derive(Debug, Default)]
struct SiblingScan<'a> {
    same_subgroup: Option<&'a ChannelEntry>,
    same_group: Option<&'a ChannelEntry>,
}

fn scan<'a>(snapshot: &'a CategorySnapshot, key: &ChannelNameKey) -> SiblingScan<'a> {
    let group_prefix = key.group_prefix();
    let subgroup_prefix = key.subgroup_prefix();

    let mut found = SiblingScan::default();
    for child in snapshot.iter() {
        if child.name.starts_with(&group_prefix) {
            found.same_group = Some(child);
        }
        let same_subgroup = match &subgroup_prefix {
            Some(prefix) => child.name.starts_with(prefix.as_str()),
            // Subgroup-less names cluster with every other subgroup-less child.
            None => delimiter_count(&child.name) == 1,
        };
        if same_subgroup {
            found.same_subgroup = Some(child);
        }
    }
    found
}

/// Compute where a channel named by `key` goes in `snapshot`.
///
/// A `band_width` of zero is treated as one.
pub fn ordinal_for(
    snapshot: &CategorySnapshot,
    key: &ChannelNameKey,
    band_width: Position,
) -> Ordinal {
    let band_width = band_width.max(1);
    let found = scan(snapshot, key);

    if let Some(sibling) = found.same_subgroup {
        return Ordinal {
            position: sibling.position,
            rule: OrdinalRule::SameSubgroup,
        };
    }
    if let Some(sibling) = found.same_group {
        return Ordinal {
            position: sibling.position.saturating_add(1),
            rule: OrdinalRule::SameGroup,
        };
    }
    if let Some(last) = snapshot.last() {
        let band = (last.position / band_width).saturating_add(1);
        return Ordinal {
            position: band.saturating_mul(band_width),
            rule: OrdinalRule::NewBand,
        };
    }
    Ordinal {
        position: 0,
        rule: OrdinalRule::Empty,
    }
}

/// Parse `name` and compute its ordinal in `snapshot`.
pub fn compute_ordinal(
    snapshot: &CategorySnapshot,
    name: &str,
    band_width: Position,
) -> Result<Ordinal, NameError> {
    let key = ChannelNameKey::parse(name)?;
    Ok(ordinal_for(snapshot, &key, band_width))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(children: &[(&str, Position)]) -> CategorySnapshot {
        CategorySnapshot::new(
            children
                .iter()
                .enumerate()
                .map(|(i, (name, pos))| ChannelEntry::new(i as u64 + 1, *name, *pos))
                .collect(),
        )
    }

    fn position(children: &[(&str, Position)], name: &str) -> Position {
        compute_ordinal(&snapshot(children), name, DEFAULT_BAND_WIDTH)
            .expect("valid name")
            .position
    }

    #[test]
    fn new_band_saturates_at_position_ceiling() {
        let ord = compute_ordinal(&snapshot(&[("web-sqli", Position::MAX)]), "pwn-heap", 1)
            .expect("valid name");
        assert_eq!(ord.position, Position::MAX);
        assert_eq!(ord.rule, OrdinalRule::NewBand);
    }

    #[test]
    fn same_subgroup_takes_over_slot() {
        let ord = compute_ordinal(
            &snapshot(&[("pwn-baby-rev0", 5), ("web-sqli", 6)]),
            "pwn-baby-rev1",
            DEFAULT_BAND_WIDTH,
        )
        .expect("valid name");
        assert_eq!(ord.position, 5);
        assert_eq!(ord.rule, OrdinalRule::SameSubgroup);
    }

    #[test]
    fn same_group_goes_after_last_sibling() {
        assert_eq!(position(&[("pwn-baby-rev0", 5)], "pwn-crypto-aes"), 6);
    }

    #[test]
    fn last_matching_sibling_wins() {
        let children = [("pwn-baby-a", 3), ("pwn-baby-b", 4), ("pwn-heap-c", 9)];
        assert_eq!(position(&children, "pwn-baby-z"), 4);
        assert_eq!(position(&children, "pwn-kernel-z"), 10);
    }

    #[test]
    fn new_group_opens_next_band() {
        let ord = compute_ordinal(&snapshot(&[("pwn-a", 3000)]), "web-x", DEFAULT_BAND_WIDTH)
            .expect("valid name");
        assert_eq!(ord.position, 4000);
        assert_eq!(ord.rule, OrdinalRule::NewBand);
        assert_eq!(position(&[("pwn-a", 3999)], "web-x"), 4000);
        assert_eq!(position(&[("pwn-a", 0)], "web-x-y"), 1000);
    }

    #[test]
    fn empty_category_is_zero() {
        let ord = compute_ordinal(&CategorySnapshot::default(), "pwn-a", DEFAULT_BAND_WIDTH)
            .expect("valid name");
        assert_eq!(ord.position, 0);
        assert_eq!(ord.rule, OrdinalRule::Empty);
    }

    #[test]
    fn subgroupless_name_clusters_with_subgroupless_children() {
        let children = [("pwn-a", 1), ("pwn-baby-b", 2), ("web-c", 7)];
        assert_eq!(position(&children, "pwn-z"), 7);
    }

    #[test]
    fn prefix_match_is_delimiter_bounded() {
        // `pwnable-` must not count as a sibling of group `pwn`.
        assert_eq!(position(&[("pwnable-x-y", 12)], "pwn-x-z"), 1000);
    }

    #[test]
    fn custom_band_width() {
        let ord = compute_ordinal(&snapshot(&[("pwn-a", 250)]), "web-x", 100).expect("valid name");
        assert_eq!(ord.position, 300);
    }

    #[test]
    fn invalid_name_is_rejected() {
        let result = compute_ordinal(&CategorySnapshot::default(), "general", DEFAULT_BAND_WIDTH);
        assert!(matches!(result, Err(NameError::MissingDelimiter { .. })));
    }
}
