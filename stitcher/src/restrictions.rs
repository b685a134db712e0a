// Stitcher: Dependency-Ordered VLAN Stitching for Federated Testbeds
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Restrictions
//!
//! This module contains the restriction store of a single aggregate. Every aggregate has one
//! *global* [`RestrictionSet`], and one `RestrictionSet` for every interface that was queried or
//! configured. A `RestrictionSet` consists of two restrictions:
//!
//! - [`VlanRange`]: The set of VLAN tags that may be used on the interface. This is either a
//!   concrete set of tags, or the wildcard [`VlanRange::Any`].
//! - `vlan_translation`: Note that the naming is inverted! If this flag is set to `true`, then the
//!   interface is *restricted*, which means that it **cannot** translate VLAN tags. If it is set
//!   to `false`, then the interface is able to translate VLAN tags.
//!
//! Restrictions are never removed. Querying a restriction of an interface that is not yet known
//! returns the default restriction set (`VlanRange::Any`, `vlan_translation = false`).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// VLAN Tag
pub type VlanTag = u16;
/// Smallest VLAN tag that can be assigned
pub const MIN_VLAN_TAG: VlanTag = 1;
/// Largest VLAN tag that can be assigned
pub const MAX_VLAN_TAG: VlanTag = 4094;

/// Error while parsing a VLAN range
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum VlanRangeError {
    /// A token between two commas is empty
    #[error("Empty element in the VLAN range")]
    EmptyElement,
    /// A token is not a number
    #[error("Cannot parse the VLAN tag: {0}")]
    InvalidTag(String),
    /// The tag is outside of the valid range
    #[error("VLAN tag {0} is outside of the valid range 1-4094")]
    OutOfRange(u32),
    /// The start of a range is larger than its end
    #[error("VLAN range {0}-{1} is reversed")]
    ReversedRange(VlanTag, VlanTag),
}

/// # VLAN Range
///
/// Either the wildcard `Any`, or a sorted set of VLAN tags. The concrete set may be empty, which
/// means that no tag can be used at all.
///
/// ```
/// use stitcher::restrictions::VlanRange;
///
/// let a: VlanRange = "1-10".parse().unwrap();
/// let b: VlanRange = "5-15".parse().unwrap();
/// assert_eq!(a.intersect(&b).to_string(), "5-10");
/// assert_eq!(VlanRange::Any.intersect(&a), a);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VlanRange {
    /// Any tag may be used
    Any,
    /// Only the tags in the set may be used
    Tags(BTreeSet<VlanTag>),
}

impl Default for VlanRange {
    fn default() -> Self {
        Self::Any
    }
}

impl VlanRange {
    /// Create a concrete range from an iterator of tags. Tags outside of `1..=4094` are dropped.
    pub fn tags<I: IntoIterator<Item = VlanTag>>(tags: I) -> Self {
        Self::Tags(tags.into_iter().filter(|t| (MIN_VLAN_TAG..=MAX_VLAN_TAG).contains(t)).collect())
    }

    /// Create a concrete range containing all tags between `from` and `to` (both included). The
    /// bounds are clamped to `1..=4094`, and the range is empty if `from > to`.
    pub fn inclusive(from: VlanTag, to: VlanTag) -> Self {
        Self::Tags((from.max(MIN_VLAN_TAG)..=to.min(MAX_VLAN_TAG)).collect())
    }

    /// Create an empty (conflicting) range
    pub fn empty() -> Self {
        Self::Tags(BTreeSet::new())
    }

    /// Returns `true` if the range is the wildcard
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Returns `true` if the range is concrete and contains no tag.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Any => false,
            Self::Tags(t) => t.is_empty(),
        }
    }

    /// Returns `true` if the tag may be used.
    pub fn contains(&self, tag: VlanTag) -> bool {
        match self {
            Self::Any => (MIN_VLAN_TAG..=MAX_VLAN_TAG).contains(&tag),
            Self::Tags(t) => t.contains(&tag),
        }
    }

    /// Returns the lowest tag that may be used, or `None` if the range is empty.
    pub fn first(&self) -> Option<VlanTag> {
        match self {
            Self::Any => Some(MIN_VLAN_TAG),
            Self::Tags(t) => t.iter().next().copied(),
        }
    }

    /// Intersect two ranges. The wildcard is the neutral element. The result may be empty.
    pub fn intersect(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, x) | (x, Self::Any) => x.clone(),
            (Self::Tags(a), Self::Tags(b)) => Self::Tags(a.intersection(b).copied().collect()),
        }
    }

    /// Returns `true` if `self` is a subset of `main`. Everything is a subset of the wildcard, but
    /// the wildcard is never a subset of a concrete range.
    pub fn is_subset(&self, main: &Self) -> bool {
        match (self, main) {
            (_, Self::Any) => true,
            (Self::Any, Self::Tags(_)) => false,
            (Self::Tags(sub), Self::Tags(main)) => sub.is_subset(main),
        }
    }
}

/// Intersect two VLAN ranges. See [`VlanRange::intersect`].
pub fn intersect_vlan_range(a: &VlanRange, b: &VlanRange) -> VlanRange {
    a.intersect(b)
}

/// Check if `sub` is a subset of `main`. See [`VlanRange::is_subset`].
pub fn is_subset(sub: &VlanRange, main: &VlanRange) -> bool {
    sub.is_subset(main)
}

fn parse_tag(s: &str) -> Result<VlanTag, VlanRangeError> {
    let value: u32 =
        s.trim().parse().map_err(|_| VlanRangeError::InvalidTag(s.trim().to_string()))?;
    if value < MIN_VLAN_TAG as u32 || value > MAX_VLAN_TAG as u32 {
        return Err(VlanRangeError::OutOfRange(value));
    }
    Ok(value as VlanTag)
}

impl FromStr for VlanRange {
    type Err = VlanRangeError;

    /// Parses either `any` (case insensitive), or a comma separated list of tags and inclusive
    /// ranges, like `1-10,20,30-32`. The empty string is parsed as the empty range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("any") {
            return Ok(Self::Any);
        }
        let mut tags = BTreeSet::new();
        if s.is_empty() {
            return Ok(Self::Tags(tags));
        }
        for element in s.split(',') {
            let element = element.trim();
            if element.is_empty() {
                return Err(VlanRangeError::EmptyElement);
            }
            match element.find('-') {
                Some(pos) => {
                    let from = parse_tag(&element[..pos])?;
                    let to = parse_tag(&element[pos + 1..])?;
                    if from > to {
                        return Err(VlanRangeError::ReversedRange(from, to));
                    }
                    tags.extend(from..=to);
                }
                None => {
                    tags.insert(parse_tag(element)?);
                }
            }
        }
        Ok(Self::Tags(tags))
    }
}

impl fmt::Display for VlanRange {
    /// Writes `any`, or the compressed list of ranges (e.g., `1-10,20`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags = match self {
            Self::Any => return write!(f, "any"),
            Self::Tags(t) => t,
        };
        let mut runs: Vec<(VlanTag, VlanTag)> = Vec::new();
        for tag in tags.iter().copied() {
            match runs.last_mut() {
                Some((_, end)) if *end + 1 == tag => *end = tag,
                _ => runs.push((tag, tag)),
            }
        }
        let repr = runs
            .into_iter()
            .map(|(a, b)| if a == b { a.to_string() } else { format!("{}-{}", a, b) })
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}", repr)
    }
}

impl TryFrom<String> for VlanRange {
    type Error = VlanRangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VlanRange> for String {
    fn from(range: VlanRange) -> Self {
        range.to_string()
    }
}

/// # Restriction Set
///
/// Restrictions of either a single interface, or the global restrictions of an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RestrictionSet {
    /// VLAN tags that may be used.
    pub vlan_range: VlanRange,
    /// **Inverted**: `true` means that VLAN translation is *not* possible.
    pub vlan_translation: bool,
}

impl RestrictionSet {
    /// Create a new restriction set
    pub fn new(vlan_range: VlanRange, vlan_translation: bool) -> Self {
        Self { vlan_range, vlan_translation }
    }

    /// Restriction set of an interface that is able to translate VLAN tags.
    pub fn translating(vlan_range: VlanRange) -> Self {
        Self::new(vlan_range, false)
    }

    /// Restriction set of an interface that cannot translate VLAN tags.
    pub fn restricted(vlan_range: VlanRange) -> Self {
        Self::new(vlan_range, true)
    }

    /// Returns `true` if VLAN translation is possible, i.e., `vlan_translation` is `false`.
    pub fn translates(&self) -> bool {
        !self.vlan_translation
    }
}

/// # Restriction Store
///
/// Global restriction set of an aggregate, and all per-interface restriction sets. Interface
/// restriction sets are created lazily.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestrictionStore {
    global: RestrictionSet,
    interfaces: BTreeMap<String, RestrictionSet>,
}

impl RestrictionStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the global restriction set
    pub fn global(&self) -> &RestrictionSet {
        &self.global
    }

    /// Get a mutable reference to the global restriction set
    pub fn global_mut(&mut self) -> &mut RestrictionSet {
        &mut self.global
    }

    /// Get the restriction set of the interface. If the interface is not yet known, a defaulted
    /// restriction set is returned.
    pub fn restriction(&self, interface: impl AsRef<str>) -> RestrictionSet {
        self.interfaces.get(interface.as_ref()).cloned().unwrap_or_default()
    }

    /// Returns `true` if the interface has a restriction set stored.
    pub fn has_restriction(&self, interface: impl AsRef<str>) -> bool {
        self.interfaces.contains_key(interface.as_ref())
    }

    /// Get a mutable reference to the restriction set of the interface, creating it if necessary.
    pub fn restriction_mut(&mut self, interface: impl Into<String>) -> &mut RestrictionSet {
        self.interfaces.entry(interface.into()).or_default()
    }

    /// Overwrite the restriction set of the interface.
    pub fn set_restriction(&mut self, interface: impl Into<String>, restriction: RestrictionSet) {
        self.interfaces.insert(interface.into(), restriction);
    }

    /// Overwrite only the VLAN range of the interface.
    pub fn set_vlan_range(&mut self, interface: impl Into<String>, vlan_range: VlanRange) {
        self.restriction_mut(interface).vlan_range = vlan_range;
    }

    /// Overwrite only the vlan translation flag of the interface (`true` means restricted).
    pub fn set_vlan_translation(&mut self, interface: impl Into<String>, vlan_translation: bool) {
        self.restriction_mut(interface).vlan_translation = vlan_translation;
    }

    /// Iterate over all interface restriction sets, ordered by interface URN.
    pub fn interfaces(&self) -> impl Iterator<Item = (&str, &RestrictionSet)> {
        self.interfaces.iter().map(|(k, v)| (k.as_str(), v))
    }
}
