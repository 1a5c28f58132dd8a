use crate::error::{Error, Result};

/// Binary writer producing descriptor byte buffers.
pub struct BinaryWriter {
    data: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn write_u16_le(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i16_le(&mut self, v: i16) {
        self.write_u16_le(v as u16);
    }

    pub fn write_u32_le(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32_le(&mut self, v: i32) {
        self.write_u32_le(v as u32);
    }

    pub fn write_f32_le(&mut self, v: f32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a string into a fixed-size, NUL-padded field.
    pub fn write_fixed_string(&mut self, s: &str, n: usize) -> Result<()> {
        let bytes = s.as_bytes();
        if bytes.len() > n {
            return Err(Error::TextureNameTooLong {
                name: s.to_string(),
                len: bytes.len(),
                max: n,
            });
        }
        self.data.extend_from_slice(bytes);
        self.data.extend(std::iter::repeat(0u8).take(n - bytes.len()));
        Ok(())
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryReader;

    #[test]
    fn test_roundtrip_primitives() {
        let mut writer = BinaryWriter::new();
        writer.write_u8(0x42);
        writer.write_u16_le(0x1234);
        writer.write_i32_le(-7);
        writer.write_f32_le(1.5);

        let data = writer.into_vec();
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 0x42);
        assert_eq!(reader.read_u16_le().unwrap(), 0x1234);
        assert_eq!(reader.read_i32_le().unwrap(), -7);
        assert_eq!(reader.read_f32_le().unwrap(), 1.5);
    }

    #[test]
    fn test_roundtrip_fixed_string() {
        let mut writer = BinaryWriter::new();
        writer.write_fixed_string("c0c0c1c-1_5.bmp", 40).unwrap();
        assert_eq!(writer.len(), 40);

        let data = writer.into_vec();
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_fixed_string(40).unwrap(), "c0c0c1c-1_5.bmp");
    }

    #[test]
    fn test_fixed_string_overflow_rejected() {
        let mut writer = BinaryWriter::new();
        assert!(writer.write_fixed_string("0123456789", 4).is_err());
    }
}
