use indexmap::IndexSet;

use crate::codec::{BinaryReader, BinaryWriter};
use crate::error::{Error, Result};

pub const GROUND_MAGIC: &[u8; 4] = b"GRGN";

/// Newer mesh versions carry sections this pipeline does not model; inputs
/// above this are clamped down on load.
pub const MAX_SUPPORTED_VERSION: (u8, u8) = (1, 7);

const DEFAULT_TEXTURE_NAME_LEN: u32 = 80;

/// Ordered set of unique texture names; insertion order is the index the
/// tiles reference. Append-only during a generation run.
#[derive(Debug, Clone, Default)]
pub struct TextureTable {
    names: IndexSet<String>,
}

impl TextureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-or-lookup; the same name always yields the same index.
    pub fn add_or_lookup(&mut self, name: &str) -> usize {
        match self.names.get_index_of(name) {
            Some(index) => index,
            None => self.names.insert_full(name.to_string()).0,
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }
}

/// Per-tile lightmap slabs, kept as one opaque blob between load and save.
#[derive(Debug, Clone)]
pub struct Lightmaps {
    pub count: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub cell_depth: u32,
    pub data: Vec<u8>,
}

impl Lightmaps {
    /// Byte size of one slab; None when the header dimensions overflow.
    fn slab_size(&self) -> Option<usize> {
        let cells = (self.cell_width as usize).checked_mul(self.cell_height as usize)?;
        cells
            .checked_mul(self.cell_depth as usize)?
            .checked_add(cells.checked_mul(3)?)
    }

    /// Replace everything with a single full-bright slab.
    pub fn reset(&mut self) {
        self.count = 1;
        let cells = (self.cell_width as usize).saturating_mul(self.cell_height as usize);
        let mut slab = vec![0xFFu8; cells * self.cell_depth as usize];
        slab.extend(std::iter::repeat(0u8).take(cells * 3));
        self.data = slab;
    }
}

impl Default for Lightmaps {
    fn default() -> Self {
        let mut lightmaps = Lightmaps {
            count: 0,
            cell_width: 8,
            cell_height: 8,
            cell_depth: 1,
            data: Vec::new(),
        };
        lightmaps.reset();
        lightmaps
    }
}

/// A texture+UV binding attached to one cube face.
#[derive(Debug, Clone)]
pub struct GroundTile {
    pub u: [f32; 4],
    pub v: [f32; 4],
    pub texture: i16,
    pub light: u16,
    pub color: [u8; 4],
}

impl GroundTile {
    pub fn new(texture: i16) -> Self {
        let mut tile = Self {
            u: [0.0; 4],
            v: [0.0; 4],
            texture,
            light: 0,
            color: [0xFF; 4],
        };
        tile.reset_uv();
        tile
    }

    /// Default full-tile mapping.
    pub fn reset_uv(&mut self) {
        self.u = [0.0, 1.0, 0.0, 1.0];
        self.v = [0.0, 0.0, 1.0, 1.0];
    }
}

/// One cell of the renderable mesh grid. Tile slots are indexes into the
/// mesh tile arena, -1 means "none".
#[derive(Debug, Clone)]
pub struct GroundCube {
    pub heights: [f32; 4],
    pub tile_up: i32,
    pub tile_side: i32,
    pub tile_front: i32,
}

impl GroundCube {
    pub fn average_height(&self) -> f32 {
        self.heights.iter().sum::<f32>() / 4.0
    }

    pub fn bottom_left(&self) -> f32 {
        self.heights[0]
    }
}

/// The ground mesh (`.gnd`).
#[derive(Debug, Clone)]
pub struct GroundMesh {
    pub version: (u8, u8),
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    texture_name_len: u32,
    pub textures: TextureTable,
    pub lightmaps: Lightmaps,
    pub tiles: Vec<GroundTile>,
    pub cubes: Vec<GroundCube>,
}

impl GroundMesh {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            version: MAX_SUPPORTED_VERSION,
            width,
            height,
            scale: 10.0,
            texture_name_len: DEFAULT_TEXTURE_NAME_LEN,
            textures: TextureTable::new(),
            lightmaps: Lightmaps::default(),
            tiles: Vec::new(),
            cubes: vec![
                GroundCube { heights: [0.0; 4], tile_up: -1, tile_side: -1, tile_front: -1 };
                (width * height) as usize
            ],
        }
    }

    pub fn load(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let magic = reader.read_bytes(4)?;
        if magic != GROUND_MAGIC {
            return Err(Error::format("ground", format!("bad magic {:02x?}", magic)));
        }
        let version = (reader.read_u8()?, reader.read_u8()?);
        let width = reader.read_u32_le()?;
        let height = reader.read_u32_le()?;
        let scale = reader.read_f32_le()?;
        let texture_count = reader.read_u32_le()?;
        let texture_name_len = reader.read_u32_le()?;
        if texture_name_len == 0 || texture_name_len > 256 {
            return Err(Error::format(
                "ground",
                format!("implausible texture name field size {}", texture_name_len),
            ));
        }

        let mut textures = TextureTable::new();
        for _ in 0..texture_count {
            let name = reader.read_fixed_string(texture_name_len as usize)?;
            textures.add_or_lookup(&name);
        }

        let count = reader.read_u32_le()?;
        let cell_width = reader.read_u32_le()?;
        let cell_height = reader.read_u32_le()?;
        let cell_depth = reader.read_u32_le()?;
        let mut lightmaps = Lightmaps {
            count,
            cell_width,
            cell_height,
            cell_depth,
            data: Vec::new(),
        };
        let slab = lightmaps
            .slab_size()
            .ok_or_else(|| Error::format("ground", "lightmap dimensions overflow"))?;
        let total = slab
            .checked_mul(count as usize)
            .ok_or_else(|| Error::format("ground", "lightmap section overflow"))?;
        lightmaps.data = reader.read_bytes(total)?.to_vec();

        let tile_count = reader.read_u32_le()? as usize;
        let mut tiles = Vec::with_capacity(tile_count);
        for _ in 0..tile_count {
            let mut u = [0.0f32; 4];
            let mut v = [0.0f32; 4];
            for value in &mut u {
                *value = reader.read_f32_le()?;
            }
            for value in &mut v {
                *value = reader.read_f32_le()?;
            }
            let texture = reader.read_i16_le()?;
            let light = reader.read_u16_le()?;
            let color = reader.read_bytes(4)?;
            tiles.push(GroundTile {
                u,
                v,
                texture,
                light,
                color: [color[0], color[1], color[2], color[3]],
            });
        }

        let cube_count = width
            .checked_mul(height)
            .ok_or_else(|| Error::format("ground", "mesh dimensions overflow"))?
            as usize;
        let mut cubes = Vec::with_capacity(cube_count);
        for _ in 0..cube_count {
            let mut heights = [0.0f32; 4];
            for h in &mut heights {
                *h = reader.read_f32_le()?;
            }
            cubes.push(GroundCube {
                heights,
                tile_up: reader.read_i32_le()?,
                tile_side: reader.read_i32_le()?,
                tile_front: reader.read_i32_le()?,
            });
        }

        Ok(Self {
            version,
            width,
            height,
            scale,
            texture_name_len,
            textures,
            lightmaps,
            tiles,
            cubes,
        })
    }

    pub fn save(&self) -> Result<Vec<u8>> {
        let mut writer = BinaryWriter::with_capacity(
            26 + self.textures.len() * self.texture_name_len as usize
                + self.lightmaps.data.len()
                + self.tiles.len() * 40
                + self.cubes.len() * 28,
        );
        writer.write_bytes(GROUND_MAGIC);
        writer.write_u8(self.version.0);
        writer.write_u8(self.version.1);
        writer.write_u32_le(self.width);
        writer.write_u32_le(self.height);
        writer.write_f32_le(self.scale);
        writer.write_u32_le(self.textures.len() as u32);
        writer.write_u32_le(self.texture_name_len);
        for name in self.textures.iter() {
            writer.write_fixed_string(name, self.texture_name_len as usize)?;
        }

        writer.write_u32_le(self.lightmaps.count);
        writer.write_u32_le(self.lightmaps.cell_width);
        writer.write_u32_le(self.lightmaps.cell_height);
        writer.write_u32_le(self.lightmaps.cell_depth);
        writer.write_bytes(&self.lightmaps.data);

        writer.write_u32_le(self.tiles.len() as u32);
        for tile in &self.tiles {
            for value in tile.u {
                writer.write_f32_le(value);
            }
            for value in tile.v {
                writer.write_f32_le(value);
            }
            writer.write_i16_le(tile.texture);
            writer.write_u16_le(tile.light);
            writer.write_bytes(&tile.color);
        }

        for cube in &self.cubes {
            for h in cube.heights {
                writer.write_f32_le(h);
            }
            writer.write_i32_le(cube.tile_up);
            writer.write_i32_le(cube.tile_side);
            writer.write_i32_le(cube.tile_front);
        }

        Ok(writer.into_vec())
    }

    /// Clamp a newer input version down to what this pipeline emits.
    pub fn clamp_version(&mut self) {
        if self.version > MAX_SUPPORTED_VERSION {
            self.version = MAX_SUPPORTED_VERSION;
        }
    }

    pub fn set_cubes_height(&mut self, height: f32) {
        for cube in &mut self.cubes {
            cube.heights = [height; 4];
        }
    }

    /// Drop all lightmap detail and point every tile at one full-bright slab.
    pub fn remove_lightmaps(&mut self) {
        self.lightmaps.reset();
        for tile in &mut self.tiles {
            tile.light = 0;
        }
    }

    pub fn reset_textures(&mut self) {
        self.textures.clear();
    }

    pub fn remove_all_tiles(&mut self) {
        self.tiles.clear();
        for cube in &mut self.cubes {
            cube.tile_up = -1;
            cube.tile_side = -1;
            cube.tile_front = -1;
        }
    }

    /// Minimum bottom-left corner height across all cubes.
    pub fn min_height(&self) -> f32 {
        self.cubes
            .iter()
            .map(|c| c.bottom_left())
            .fold(f32::INFINITY, f32::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_table_unique_indices() {
        let mut table = TextureTable::new();
        let a = table.add_or_lookup("a.bmp");
        let b = table.add_or_lookup("b.bmp");
        let a2 = table.add_or_lookup("a.bmp");
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(a2, a);
        assert_eq!(table.len(), 2);
        assert_eq!(table.index_of("b.bmp"), Some(1));
        assert_eq!(table.index_of("c.bmp"), None);
    }

    #[test]
    fn test_load_save_roundtrip() {
        let mut mesh = GroundMesh::new(2, 2);
        mesh.textures.add_or_lookup("c0c0c0c0.bmp");
        mesh.tiles.push(GroundTile::new(0));
        mesh.cubes[3].heights = [1.0, 2.0, 3.0, 4.0];
        mesh.cubes[3].tile_up = 0;

        let reloaded = GroundMesh::load(&mesh.save().unwrap()).unwrap();
        assert_eq!(reloaded.width, 2);
        assert_eq!(reloaded.textures.index_of("c0c0c0c0.bmp"), Some(0));
        assert_eq!(reloaded.tiles.len(), 1);
        assert_eq!(reloaded.tiles[0].u, [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(reloaded.cubes[3].heights, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(reloaded.cubes[3].tile_up, 0);
        assert_eq!(reloaded.cubes[0].tile_up, -1);
    }

    #[test]
    fn test_version_clamp() {
        let mut mesh = GroundMesh::new(1, 1);
        mesh.version = (1, 8);
        mesh.clamp_version();
        assert_eq!(mesh.version, (1, 7));

        mesh.version = (1, 6);
        mesh.clamp_version();
        assert_eq!(mesh.version, (1, 6));
    }

    #[test]
    fn test_remove_all_tiles_clears_slots() {
        let mut mesh = GroundMesh::new(1, 1);
        mesh.tiles.push(GroundTile::new(0));
        mesh.cubes[0].tile_up = 0;
        mesh.cubes[0].tile_side = 0;
        mesh.remove_all_tiles();
        assert!(mesh.tiles.is_empty());
        assert_eq!(mesh.cubes[0].tile_up, -1);
        assert_eq!(mesh.cubes[0].tile_side, -1);
    }

    #[test]
    fn test_overflowing_lightmap_header_rejected() {
        use crate::codec::BinaryWriter;

        let mut writer = BinaryWriter::new();
        writer.write_bytes(GROUND_MAGIC);
        writer.write_u8(1);
        writer.write_u8(7);
        writer.write_u32_le(1); // width
        writer.write_u32_le(1); // height
        writer.write_f32_le(10.0);
        writer.write_u32_le(0); // texture count
        writer.write_u32_le(80);
        writer.write_u32_le(1); // lightmap count
        writer.write_u32_le(u32::MAX); // cell width
        writer.write_u32_le(2); // cell height
        writer.write_u32_le(u32::MAX); // cell depth

        assert!(matches!(
            GroundMesh::load(&writer.into_vec()),
            Err(Error::Format { kind: "ground", .. })
        ));
    }

    #[test]
    fn test_min_height() {
        let mut mesh = GroundMesh::new(2, 1);
        mesh.cubes[0].heights = [5.0, 0.0, 0.0, 0.0];
        mesh.cubes[1].heights = [-20.0, 0.0, 0.0, 0.0];
        assert_eq!(mesh.min_height(), -20.0);
    }
}
