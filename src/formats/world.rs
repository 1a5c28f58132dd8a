use crate::codec::{BinaryReader, BinaryWriter};
use crate::error::{Error, Result};

pub const WORLD_MAGIC: &[u8; 4] = b"GRSW";

/// From this version on the water section lives in the ground mesh instead.
pub const WATER_IN_GROUND_VERSION: (u8, u8) = (2, 6);

const FILE_REF_LEN: usize = 40;

#[derive(Debug, Clone)]
pub struct WaterParams {
    pub level: f32,
    pub water_type: i32,
    pub wave_height: f32,
    pub wave_speed: f32,
    pub wave_pitch: f32,
    pub anim_speed: i32,
}

impl WaterParams {
    pub fn reset(&mut self) {
        *self = WaterParams::default();
    }
}

impl Default for WaterParams {
    fn default() -> Self {
        Self {
            level: 0.0,
            water_type: 0,
            wave_height: 1.0,
            wave_speed: 2.0,
            wave_pitch: 50.0,
            anim_speed: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LightParams {
    pub longitude: i32,
    pub latitude: i32,
    pub diffuse: [f32; 3],
    pub ambient: [f32; 3],
    pub opacity: f32,
}

impl LightParams {
    pub fn reset(&mut self) {
        *self = LightParams::default();
    }
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            longitude: 45,
            latitude: 45,
            diffuse: [1.0; 3],
            ambient: [0.3; 3],
            opacity: 1.0,
        }
    }
}

/// The world descriptor (`.rsw`): lighting, water and the object list. The
/// object section is carried as an opaque tail so unmodified maps survive a
/// load/save cycle byte-compatibly.
#[derive(Debug, Clone)]
pub struct WorldDescriptor {
    pub version: (u8, u8),
    pub build: Option<i32>,
    pub ini_file: String,
    pub gnd_file: String,
    pub gat_file: String,
    pub src_file: String,
    pub water: WaterParams,
    pub light: LightParams,
    pub bounds: [i32; 4],
    pub object_count: u32,
    pub objects: Vec<u8>,
}

impl WorldDescriptor {
    /// Fresh descriptor for a rebuilt map, light and water at defaults.
    pub fn create_empty(map_name: &str) -> Self {
        Self {
            version: (1, 9),
            build: None,
            ini_file: String::new(),
            gnd_file: format!("{map_name}.gnd"),
            gat_file: format!("{map_name}.gat"),
            src_file: String::new(),
            water: WaterParams::default(),
            light: LightParams::default(),
            bounds: [-500, 500, -500, 500],
            object_count: 0,
            objects: Vec::new(),
        }
    }

    pub fn load(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let version = read_header(&mut reader)?;
        let build = if version >= (2, 5) {
            Some(reader.read_i32_le()?)
        } else {
            None
        };

        let ini_file = reader.read_fixed_string(FILE_REF_LEN)?;
        let gnd_file = reader.read_fixed_string(FILE_REF_LEN)?;
        let gat_file = reader.read_fixed_string(FILE_REF_LEN)?;
        let src_file = reader.read_fixed_string(FILE_REF_LEN)?;

        let water = if version < WATER_IN_GROUND_VERSION {
            read_water(&mut reader)?
        } else {
            WaterParams::default()
        };

        let light = LightParams {
            longitude: reader.read_i32_le()?,
            latitude: reader.read_i32_le()?,
            diffuse: [
                reader.read_f32_le()?,
                reader.read_f32_le()?,
                reader.read_f32_le()?,
            ],
            ambient: [
                reader.read_f32_le()?,
                reader.read_f32_le()?,
                reader.read_f32_le()?,
            ],
            opacity: reader.read_f32_le()?,
        };

        let bounds = [
            reader.read_i32_le()?,
            reader.read_i32_le()?,
            reader.read_i32_le()?,
            reader.read_i32_le()?,
        ];

        let object_count = reader.read_u32_le()?;
        let objects = reader.read_to_end().to_vec();

        Ok(Self {
            version,
            build,
            ini_file,
            gnd_file,
            gat_file,
            src_file,
            water,
            light,
            bounds,
            object_count,
            objects,
        })
    }

    pub fn save(&self) -> Result<Vec<u8>> {
        let mut writer = BinaryWriter::with_capacity(256 + self.objects.len());
        writer.write_bytes(WORLD_MAGIC);
        writer.write_u8(self.version.0);
        writer.write_u8(self.version.1);
        if self.version >= (2, 5) {
            writer.write_i32_le(self.build.unwrap_or(0));
        }
        writer.write_fixed_string(&self.ini_file, FILE_REF_LEN)?;
        writer.write_fixed_string(&self.gnd_file, FILE_REF_LEN)?;
        writer.write_fixed_string(&self.gat_file, FILE_REF_LEN)?;
        writer.write_fixed_string(&self.src_file, FILE_REF_LEN)?;

        if self.version < WATER_IN_GROUND_VERSION {
            writer.write_f32_le(self.water.level);
            writer.write_i32_le(self.water.water_type);
            writer.write_f32_le(self.water.wave_height);
            writer.write_f32_le(self.water.wave_speed);
            writer.write_f32_le(self.water.wave_pitch);
            writer.write_i32_le(self.water.anim_speed);
        }

        writer.write_i32_le(self.light.longitude);
        writer.write_i32_le(self.light.latitude);
        for value in self.light.diffuse {
            writer.write_f32_le(value);
        }
        for value in self.light.ambient {
            writer.write_f32_le(value);
        }
        writer.write_f32_le(self.light.opacity);

        for value in self.bounds {
            writer.write_i32_le(value);
        }

        writer.write_u32_le(self.object_count);
        writer.write_bytes(&self.objects);
        Ok(writer.into_vec())
    }

    pub fn reset_light(&mut self) {
        self.light.reset();
    }

    pub fn remove_objects(&mut self) {
        self.object_count = 0;
        self.objects.clear();
    }
}

/// Version of a world descriptor without a full parse.
pub fn peek_version(data: &[u8]) -> Result<(u8, u8)> {
    read_header(&mut BinaryReader::new(data))
}

/// Water level of a world descriptor without a full parse. Descriptors new
/// enough to keep water in the ground mesh report level 0.
pub fn peek_water_level(data: &[u8]) -> Result<f32> {
    let mut reader = BinaryReader::new(data);
    let version = read_header(&mut reader)?;
    if version >= WATER_IN_GROUND_VERSION {
        return Ok(0.0);
    }
    if version >= (2, 5) {
        reader.read_i32_le()?;
    }
    reader.read_bytes(4 * FILE_REF_LEN)?;
    reader.read_f32_le()
}

fn read_header(reader: &mut BinaryReader) -> Result<(u8, u8)> {
    let magic = reader.read_bytes(4)?;
    if magic != WORLD_MAGIC {
        return Err(Error::format("world", format!("bad magic {:02x?}", magic)));
    }
    Ok((reader.read_u8()?, reader.read_u8()?))
}

fn read_water(reader: &mut BinaryReader) -> Result<WaterParams> {
    Ok(WaterParams {
        level: reader.read_f32_le()?,
        water_type: reader.read_i32_le()?,
        wave_height: reader.read_f32_le()?,
        wave_speed: reader.read_f32_le()?,
        wave_pitch: reader.read_f32_le()?,
        anim_speed: reader.read_i32_le()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_save_roundtrip_with_objects() {
        let mut world = WorldDescriptor::create_empty("prontera");
        world.water.level = 25.0;
        world.object_count = 2;
        world.objects = vec![1, 2, 3, 4, 5];

        let bytes = world.save().unwrap();
        let reloaded = WorldDescriptor::load(&bytes).unwrap();
        assert_eq!(reloaded.version, (1, 9));
        assert_eq!(reloaded.gnd_file, "prontera.gnd");
        assert_eq!(reloaded.water.level, 25.0);
        assert_eq!(reloaded.object_count, 2);
        assert_eq!(reloaded.objects, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_peek_water_level() {
        let mut world = WorldDescriptor::create_empty("payon");
        world.water.level = -13.5;
        let bytes = world.save().unwrap();
        assert_eq!(peek_water_level(&bytes).unwrap(), -13.5);
        assert_eq!(peek_version(&bytes).unwrap(), (1, 9));
    }

    #[test]
    fn test_peek_water_level_modern_version() {
        let mut world = WorldDescriptor::create_empty("izlude");
        world.version = (2, 6);
        world.build = Some(161);
        world.water.level = 99.0; // not written for 2.6
        let bytes = world.save().unwrap();
        assert_eq!(peek_water_level(&bytes).unwrap(), 0.0);

        let reloaded = WorldDescriptor::load(&bytes).unwrap();
        assert_eq!(reloaded.build, Some(161));
        assert_eq!(reloaded.water.level, 0.0);
    }

    #[test]
    fn test_remove_objects() {
        let mut world = WorldDescriptor::create_empty("geffen");
        world.object_count = 3;
        world.objects = vec![0; 12];
        world.remove_objects();
        assert_eq!(world.object_count, 0);
        assert!(world.objects.is_empty());
    }
}
