use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// One byte per voxel. The registry resolves ids into properties; unknown ids
/// fall back to air so stale persisted data degrades to empty space.
#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
pub struct BlockId(pub u8);

impl BlockId {
    pub const AIR: Self = Self(0);
    pub const BEDROCK: Self = Self(1);
    pub const STONE: Self = Self(2);
    pub const DIRT: Self = Self(3);
    pub const GRASS: Self = Self(4);
    pub const SAND: Self = Self(5);
    pub const SNOW: Self = Self(6);
    pub const WATER: Self = Self(7);
    pub const WATER_75: Self = Self(8);
    pub const WATER_50: Self = Self(9);
    pub const WATER_25: Self = Self(10);
    pub const LOG: Self = Self(11);
    pub const LEAVES: Self = Self(12);
    pub const COAL_ORE: Self = Self(13);
    pub const IRON_ORE: Self = Self(14);
    pub const GRAVEL: Self = Self(15);
    pub const GLASS: Self = Self(16);
    pub const PLANKS: Self = Self(17);
    pub const COBBLESTONE: Self = Self(18);
}

/// Highest discrete fill level; full water.
pub const MAX_WATER_FILL: u8 = 4;

/// Fill level of a water cell: 1 = 25%, 2 = 50%, 3 = 75%, 4 = full.
pub fn water_fill_level(block: BlockId) -> Option<u8> {
    match block {
        BlockId::WATER => Some(4),
        BlockId::WATER_75 => Some(3),
        BlockId::WATER_50 => Some(2),
        BlockId::WATER_25 => Some(1),
        _ => None,
    }
}

pub fn is_water_block(block: BlockId) -> bool {
    water_fill_level(block).is_some()
}

pub fn water_block_from_fill(level: u8) -> BlockId {
    match level.clamp(1, MAX_WATER_FILL) {
        1 => BlockId::WATER_25,
        2 => BlockId::WATER_50,
        3 => BlockId::WATER_75,
        _ => BlockId::WATER,
    }
}

/// Tree blocks skipped by the surface scan; a canopy does not count as ground.
pub fn is_foliage_block(block: BlockId) -> bool {
    block == BlockId::LEAVES || block == BlockId::LOG
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockProperties {
    pub name: String,
    pub solid: bool,
    pub transparent: bool,
    pub hardness: f32,
    #[serde(default)]
    pub drops: Option<BlockId>,
}

#[derive(Default, Debug, Clone)]
pub struct BlockRegistry {
    properties: Vec<BlockProperties>,
    by_name: HashMap<String, BlockId>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn register(&mut self, props: BlockProperties) -> BlockId {
        if let Some(existing) = self.by_name.get(props.name.as_str()) {
            return *existing;
        }

        let next_index = self.properties.len();
        let id = BlockId(
            u8::try_from(next_index).expect("block registry exceeded BlockId capacity (u8::MAX)"),
        );

        self.by_name.insert(props.name.clone(), id);
        self.properties.push(props);
        id
    }

    pub fn get_properties(&self, id: BlockId) -> &BlockProperties {
        self.properties
            .get(usize::from(id.0))
            .or_else(|| self.properties.get(usize::from(BlockId::AIR.0)))
            .expect("block registry is empty; call register_default_blocks() first")
    }

    pub fn get_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn is_solid(&self, id: BlockId) -> bool {
        self.get_properties(id).solid
    }

    pub fn is_transparent(&self, id: BlockId) -> bool {
        self.get_properties(id).transparent
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

pub fn register_default_blocks() -> BlockRegistry {
    fn block(name: &str, solid: bool, transparent: bool, hardness: f32) -> BlockProperties {
        BlockProperties {
            name: name.to_string(),
            solid,
            transparent,
            hardness,
            drops: None,
        }
    }

    fn dropping(
        name: &str,
        solid: bool,
        transparent: bool,
        hardness: f32,
        drops: BlockId,
    ) -> BlockProperties {
        BlockProperties {
            drops: Some(drops),
            ..block(name, solid, transparent, hardness)
        }
    }

    let mut registry = BlockRegistry::new();

    let defaults = [
        block("air", false, true, 0.0),
        block("bedrock", true, false, f32::INFINITY),
        dropping("stone", true, false, 4.0, BlockId::COBBLESTONE),
        dropping("dirt", true, false, 1.0, BlockId::DIRT),
        dropping("grass", true, false, 1.2, BlockId::DIRT),
        dropping("sand", true, false, 0.6, BlockId::SAND),
        dropping("snow", true, false, 0.4, BlockId::SNOW),
        block("water", false, true, 0.0),
        block("water_75", false, true, 0.0),
        block("water_50", false, true, 0.0),
        block("water_25", false, true, 0.0),
        dropping("log", true, false, 2.0, BlockId::LOG),
        block("leaves", true, true, 0.2),
        dropping("coal_ore", true, false, 4.5, BlockId::COAL_ORE),
        dropping("iron_ore", true, false, 5.0, BlockId::IRON_ORE),
        dropping("gravel", true, false, 0.8, BlockId::GRAVEL),
        block("glass", true, true, 0.5),
        dropping("planks", true, false, 1.8, BlockId::PLANKS),
        dropping("cobblestone", true, false, 4.0, BlockId::COBBLESTONE),
    ];

    for (idx, props) in defaults.into_iter().enumerate() {
        let id = registry.register(props);
        debug_assert_eq!(usize::from(id.0), idx, "default block ids must be stable");
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::{
        is_foliage_block, is_water_block, register_default_blocks, water_block_from_fill,
        water_fill_level, BlockId, MAX_WATER_FILL,
    };

    #[test]
    fn registry_returns_known_block_properties() {
        let registry = register_default_blocks();

        let air = registry.get_properties(BlockId::AIR);
        assert_eq!(air.name, "air");
        assert!(!air.solid);
        assert!(air.transparent);
        assert_eq!(air.drops, None);

        let bedrock = registry.get_properties(BlockId::BEDROCK);
        assert!(bedrock.solid);
        assert!(bedrock.hardness.is_infinite());

        let stone = registry
            .get_by_name("stone")
            .expect("stone should be registered");
        assert_eq!(stone, BlockId::STONE);
        assert_eq!(
            registry.get_properties(stone).drops,
            Some(BlockId::COBBLESTONE)
        );

        let leaves = registry.get_properties(BlockId::LEAVES);
        assert!(leaves.solid);
        assert!(leaves.transparent);

        let glass = registry.get_properties(BlockId::GLASS);
        assert!(glass.solid);
        assert!(glass.transparent);

        assert_eq!(registry.len(), 19);
    }

    #[test]
    fn unknown_ids_resolve_to_air() {
        let registry = register_default_blocks();
        let props = registry.get_properties(BlockId(200));
        assert_eq!(props.name, "air");
        assert!(!props.solid);
        assert!(props.transparent);
    }

    #[test]
    fn water_helpers_map_fill_levels_both_ways() {
        assert_eq!(water_fill_level(BlockId::WATER), Some(MAX_WATER_FILL));
        assert_eq!(water_fill_level(BlockId::WATER_25), Some(1));
        assert_eq!(water_fill_level(BlockId::STONE), None);
        assert_eq!(water_fill_level(BlockId::AIR), None);

        for level in 1..=MAX_WATER_FILL {
            let block = water_block_from_fill(level);
            assert!(is_water_block(block));
            assert_eq!(water_fill_level(block), Some(level));
        }

        // Out-of-range requests clamp instead of panicking.
        assert_eq!(water_block_from_fill(0), BlockId::WATER_25);
        assert_eq!(water_block_from_fill(9), BlockId::WATER);
    }

    #[test]
    fn foliage_covers_trunk_and_canopy_only() {
        assert!(is_foliage_block(BlockId::LOG));
        assert!(is_foliage_block(BlockId::LEAVES));
        assert!(!is_foliage_block(BlockId::GRASS));
        assert!(!is_foliage_block(BlockId::WATER));
    }
}
