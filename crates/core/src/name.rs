//! Namespaced block names.
//!
//! The external boundary identifies blocks with stable string keys of the
//! form `minecraft:<path>` (e.g. `minecraft:redstone_dust`). The set is
//! closed: only the identifiers below parse. Display variants (`_on`/`_off`
//! suffixes, `piston_inner`) name observable states of the same underlying
//! kinds.

use crate::block::{BlockKind, SolidKind};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Namespace every block name lives under.
pub const NAMESPACE: &str = "minecraft";

/// Error returned when parsing an unknown or malformed [`BlockName`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNameError {
    message: String,
}

impl BlockNameError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for BlockNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BlockNameError {}

/// The closed set of wire-format block identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockName {
    /// `minecraft:redstone_dust`
    RedstoneDust,
    /// `minecraft:redstone_torch`
    RedstoneTorch,
    /// `minecraft:redstone_torch_off`
    RedstoneTorchOff,
    /// `minecraft:lever`
    Lever,
    /// `minecraft:button`
    Button,
    /// `minecraft:repeater`
    Repeater,
    /// `minecraft:repeater_on`
    RepeaterOn,
    /// `minecraft:comparator`
    Comparator,
    /// `minecraft:comparator_on`
    ComparatorOn,
    /// `minecraft:observer`
    Observer,
    /// `minecraft:observer_on`
    ObserverOn,
    /// `minecraft:piston`
    Piston,
    /// `minecraft:sticky_piston`
    StickyPiston,
    /// `minecraft:piston_head`
    PistonHead,
    /// `minecraft:piston_inner`, the base of an extended piston.
    PistonInner,
    /// `minecraft:redstone_block`
    RedstoneBlock,
    /// `minecraft:stone`
    Stone,
    /// `minecraft:obsidian`
    Obsidian,
    /// `minecraft:bedrock`
    Bedrock,
}

/// Every identifier, for registry-style iteration.
pub const ALL_NAMES: [BlockName; 19] = [
    BlockName::RedstoneDust,
    BlockName::RedstoneTorch,
    BlockName::RedstoneTorchOff,
    BlockName::Lever,
    BlockName::Button,
    BlockName::Repeater,
    BlockName::RepeaterOn,
    BlockName::Comparator,
    BlockName::ComparatorOn,
    BlockName::Observer,
    BlockName::ObserverOn,
    BlockName::Piston,
    BlockName::StickyPiston,
    BlockName::PistonHead,
    BlockName::PistonInner,
    BlockName::RedstoneBlock,
    BlockName::Stone,
    BlockName::Obsidian,
    BlockName::Bedrock,
];

impl BlockName {
    /// The path component, without the namespace.
    pub fn path(self) -> &'static str {
        match self {
            BlockName::RedstoneDust => "redstone_dust",
            BlockName::RedstoneTorch => "redstone_torch",
            BlockName::RedstoneTorchOff => "redstone_torch_off",
            BlockName::Lever => "lever",
            BlockName::Button => "button",
            BlockName::Repeater => "repeater",
            BlockName::RepeaterOn => "repeater_on",
            BlockName::Comparator => "comparator",
            BlockName::ComparatorOn => "comparator_on",
            BlockName::Observer => "observer",
            BlockName::ObserverOn => "observer_on",
            BlockName::Piston => "piston",
            BlockName::StickyPiston => "sticky_piston",
            BlockName::PistonHead => "piston_head",
            BlockName::PistonInner => "piston_inner",
            BlockName::RedstoneBlock => "redstone_block",
            BlockName::Stone => "stone",
            BlockName::Obsidian => "obsidian",
            BlockName::Bedrock => "bedrock",
        }
    }

    /// The block kind this identifier places.
    ///
    /// State variants collapse onto their base kind with default state; the
    /// engine re-evaluates a freshly placed block immediately, so e.g.
    /// `repeater_on` settles to whatever its inputs dictate.
    pub fn kind(self) -> BlockKind {
        match self {
            BlockName::RedstoneDust => BlockKind::Wire,
            BlockName::RedstoneTorch | BlockName::RedstoneTorchOff => BlockKind::Torch,
            BlockName::Lever => BlockKind::Lever,
            BlockName::Button => BlockKind::Button,
            BlockName::Repeater | BlockName::RepeaterOn => BlockKind::Repeater,
            BlockName::Comparator | BlockName::ComparatorOn => BlockKind::Comparator,
            BlockName::Observer | BlockName::ObserverOn => BlockKind::Observer,
            BlockName::Piston | BlockName::PistonInner => BlockKind::Piston,
            BlockName::StickyPiston => BlockKind::StickyPiston,
            BlockName::PistonHead => BlockKind::PistonHead,
            BlockName::RedstoneBlock => BlockKind::PowerSource,
            BlockName::Stone => BlockKind::Solid(SolidKind::Stone),
            BlockName::Obsidian => BlockKind::Solid(SolidKind::Obsidian),
            BlockName::Bedrock => BlockKind::Solid(SolidKind::Bedrock),
        }
    }

    /// Parse an identifier.
    ///
    /// Accepts either `minecraft:path` or a bare `path` (the namespace is
    /// implied). Any other namespace is rejected.
    pub fn parse(input: &str) -> Result<Self, BlockNameError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(BlockNameError::new("block name cannot be empty"));
        }

        let path = match input.split_once(':') {
            Some((ns, p)) if ns == NAMESPACE => p,
            Some((ns, _)) => {
                return Err(BlockNameError::new(format!(
                    "unknown namespace `{ns}` (expected `{NAMESPACE}`)"
                )));
            }
            None => input,
        };

        ALL_NAMES
            .iter()
            .copied()
            .find(|name| name.path() == path)
            .ok_or_else(|| BlockNameError::new(format!("unknown block name `{path}`")))
    }
}

impl fmt::Display for BlockName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{NAMESPACE}:{}", self.path())
    }
}

impl FromStr for BlockName {
    type Err = BlockNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for BlockName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlockName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}
