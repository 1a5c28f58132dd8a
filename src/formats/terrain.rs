use crate::codec::{BinaryReader, BinaryWriter};
use crate::error::{Error, Result};
use crate::formats::GroundMesh;

pub const TERRAIN_MAGIC: &[u8; 4] = b"GRAT";

/// Gutter lines repeat on a fixed block grid across the whole map.
const GUTTER_PERIOD: u32 = 40;

/// One collision cell: four corner heights plus a raw terrain type.
///
/// The water and gutter flags are not stored in the file; they start out
/// unknown and are filled in by the `identify_*` passes below.
#[derive(Debug, Clone)]
pub struct TerrainCell {
    pub heights: [f32; 4],
    pub terrain_type: u32,
    pub is_water: Option<bool>,
    pub is_inner_gutter: Option<bool>,
    pub is_outer_gutter: Option<bool>,
}

impl TerrainCell {
    pub fn new(terrain_type: u32) -> Self {
        Self {
            heights: [0.0; 4],
            terrain_type,
            is_water: None,
            is_inner_gutter: None,
            is_outer_gutter: None,
        }
    }

    pub fn average_height(&self) -> f32 {
        self.heights.iter().sum::<f32>() / 4.0
    }
}

/// The collision/water grid. Four terrain cells cover one ground cube.
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    pub version: (u8, u8),
    pub width: u32,
    pub height: u32,
    pub cells: Vec<TerrainCell>,
}

impl TerrainGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            version: (1, 2),
            width,
            height,
            cells: vec![TerrainCell::new(0); (width * height) as usize],
        }
    }

    pub fn load(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let magic = reader.read_bytes(4)?;
        if magic != TERRAIN_MAGIC {
            return Err(Error::format("terrain", format!("bad magic {:02x?}", magic)));
        }
        let version = (reader.read_u8()?, reader.read_u8()?);
        let width = reader.read_u32_le()?;
        let height = reader.read_u32_le()?;
        let count = width
            .checked_mul(height)
            .ok_or_else(|| Error::format("terrain", "grid dimensions overflow"))?
            as usize;

        let mut cells = Vec::with_capacity(count);
        for _ in 0..count {
            let mut heights = [0.0f32; 4];
            for h in &mut heights {
                *h = reader.read_f32_le()?;
            }
            let terrain_type = reader.read_u32_le()?;
            let mut cell = TerrainCell::new(terrain_type);
            cell.heights = heights;
            cells.push(cell);
        }

        Ok(Self { version, width, height, cells })
    }

    pub fn save(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(14 + self.cells.len() * 20);
        writer.write_bytes(TERRAIN_MAGIC);
        writer.write_u8(self.version.0);
        writer.write_u8(self.version.1);
        writer.write_u32_le(self.width);
        writer.write_u32_le(self.height);
        for cell in &self.cells {
            for h in cell.heights {
                writer.write_f32_le(h);
            }
            writer.write_u32_le(cell.terrain_type);
        }
        writer.into_vec()
    }

    /// Water test with the conservative out-of-range default: anything
    /// outside the grid counts as water.
    pub fn is_water_at(&self, index: isize) -> bool {
        if index < 0 || index as usize >= self.cells.len() {
            return true;
        }
        self.cells[index as usize].is_water.unwrap_or(false)
    }

    /// Mark every cell whose ground sits below the water surface. Heights
    /// grow downward, so submerged means average height above the level.
    pub fn identify_water_cells(&mut self, water_level: f32) {
        for cell in &mut self.cells {
            cell.is_water = Some(cell.average_height() > water_level);
        }
    }

    /// Mark inner/outer gutter lines on the fixed block grid: block borders
    /// are outer gutter, the center seam of each block is inner gutter.
    pub fn identify_gutter_lines(&mut self) {
        let width = self.width;
        for (i, cell) in self.cells.iter_mut().enumerate() {
            let x = i as u32 % width;
            let y = i as u32 / width;
            let (mx, my) = (x % GUTTER_PERIOD, y % GUTTER_PERIOD);
            let outer = mx == 0 || mx == GUTTER_PERIOD - 1 || my == 0 || my == GUTTER_PERIOD - 1;
            let inner = !outer && (mx == 19 || mx == 20 || my == 19 || my == 20);
            cell.is_outer_gutter = Some(outer);
            cell.is_inner_gutter = Some(inner);
        }
    }

    pub fn set_cell_heights(&mut self, height: f32) {
        for cell in &mut self.cells {
            cell.heights = [height; 4];
        }
    }

    /// Snap every cell to the (possibly flattened) ground mesh. Each ground
    /// cube covers a 2x2 block of terrain cells.
    pub fn snap_to_mesh(&mut self, mesh: &GroundMesh) {
        for (i, cell) in self.cells.iter_mut().enumerate() {
            let x = i as u32 % self.width;
            let y = i as u32 / self.width;
            let (cx, cy) = (x / 2, y / 2);
            if cx >= mesh.width || cy >= mesh.height {
                continue;
            }
            let cube = &mesh.cubes[(cy * mesh.width + cx) as usize];
            cell.heights = [cube.average_height(); 4];
        }
    }
}
