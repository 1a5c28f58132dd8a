use crate::formats::TerrainGrid;

/// Shoreline bitmask bits, one per cardinal neighbor that is NOT water.
pub const SHORE_NORTH: u8 = 1;
pub const SHORE_EAST: u8 = 2;
pub const SHORE_SOUTH: u8 = 4;
pub const SHORE_WEST: u8 = 8;

/// Texture identity of one terrain cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    /// Water, with the 4-bit shoreline orientation mask.
    Water { shoreline: u8 },
    InnerGutter,
    OuterGutter,
    /// Plain terrain with a canonical type code.
    Terrain { code: u32 },
}

impl CellClass {
    /// Base texture name fed to the variant resolver. Water with a nonzero
    /// mask never reaches the resolver; its name is fixed by the mask.
    pub fn base_name(&self) -> String {
        match self {
            CellClass::Water { shoreline: 0 } => "c-1_0".to_string(),
            CellClass::Water { shoreline } => format!("c-1_{shoreline}"),
            CellClass::InnerGutter => "c-3".to_string(),
            CellClass::OuterGutter => "c-2".to_string(),
            CellClass::Terrain { code } => format!("c{code}"),
        }
    }
}

/// The four terrain cell indices covered by the ground cube at (x, y),
/// in quadrant slot order. The terrain grid is twice as wide as the mesh.
pub fn quad_cell_indices(x: u32, y: u32, mesh_width: u32) -> [usize; 4] {
    let base = (2 * (x + 2 * y * mesh_width)) as usize;
    let row = 2 * mesh_width as usize;
    [base, base + 1, base + row, base + row + 1]
}

/// Collapse the legacy "weird" terrain codes (7-16) to their canonical
/// equivalents (0-6). Codes already canonical pass through.
pub fn canonical_type(raw: u32) -> u32 {
    match raw {
        7 => 0,  // walkable
        8 => 1,  // no-walkable
        9 => 2,  // no-walkable-no-snipable
        10 => 3, // walkable2
        11 => 4, // unknown
        12 => 5, // no-walkable-snipable
        13 => 6, // walkable3
        14..=16 => 1,
        other => other,
    }
}

/// Classify one terrain cell by its flags, falling through to the canonical
/// terrain type. Water cells get a shoreline mask from their 4 neighbors.
pub fn classify_cell(grid: &TerrainGrid, index: usize) -> CellClass {
    let cell = &grid.cells[index];
    if cell.is_water == Some(true) {
        return CellClass::Water { shoreline: shoreline_mask(grid, index) };
    }
    if cell.is_inner_gutter == Some(true) {
        return CellClass::InnerGutter;
    }
    if cell.is_outer_gutter == Some(true) {
        return CellClass::OuterGutter;
    }
    CellClass::Terrain { code: canonical_type(cell.terrain_type) }
}

/// 4-bit shoreline mask for a water cell: a bit is set when that cardinal
/// neighbor is dry land. Out-of-range neighbors count as water and never
/// set a bit.
pub fn shoreline_mask(grid: &TerrainGrid, index: usize) -> u8 {
    let index = index as isize;
    let row = grid.width as isize;

    let mut mask = 0;
    if !grid.is_water_at(index - row) {
        mask |= SHORE_NORTH;
    }
    if !grid.is_water_at(index + 1) {
        mask |= SHORE_EAST;
    }
    if !grid.is_water_at(index + row) {
        mask |= SHORE_SOUTH;
    }
    if !grid.is_water_at(index - 1) {
        mask |= SHORE_WEST;
    }
    mask
}
