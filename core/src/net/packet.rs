//! Bounded little-endian packet stream

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Vec2, Vec3};
use meshroad_shared::constants::{MAX_PACKET_SIZE, NODE_RECORD_WIRE_SIZE, PACKET_SAFETY_MARGIN};
use meshroad_shared::{NodeRecord, Transform3x4};

use crate::config::NetConfig;
use crate::error::NetError;

/// Writer that refuses to grow past its byte budget
#[derive(Debug, Clone)]
pub struct PacketWriter {
    buf: Vec<u8>,
    max_size: usize,
    safety_margin: usize,
}

impl Default for PacketWriter {
    fn default() -> Self {
        Self::new(MAX_PACKET_SIZE)
    }
}

impl PacketWriter {
    pub fn new(max_size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_size),
            max_size,
            safety_margin: PACKET_SAFETY_MARGIN,
        }
    }

    /// Writer with the configured packet budget and inline safety margin
    pub fn from_config(config: &NetConfig) -> Self {
        Self::new(config.max_packet_size).with_safety_margin(config.safety_margin)
    }

    pub fn with_safety_margin(mut self, margin: usize) -> Self {
        self.safety_margin = margin;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.max_size.saturating_sub(self.buf.len())
    }

    /// Whether `bytes` fit while keeping the safety margin free
    pub fn fits_with_margin(&self, bytes: usize) -> bool {
        bytes + self.safety_margin <= self.remaining()
    }

    /// Fail unless `bytes` more fit in the budget
    pub fn ensure(&self, bytes: usize) -> Result<(), NetError> {
        if bytes > self.remaining() {
            return Err(NetError::PacketFull {
                needed: bytes,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Drop everything written after `len`
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    /// Overwrite a byte that was already written
    pub fn patch_u8(&mut self, pos: usize, value: u8) {
        if let Some(b) = self.buf.get_mut(pos) {
            *b = value;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // Writes into a Vec cannot fail; only the budget check can.

    pub fn write_u8(&mut self, v: u8) -> Result<(), NetError> {
        self.ensure(1)?;
        self.buf.write_u8(v)?;
        Ok(())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<(), NetError> {
        self.ensure(2)?;
        self.buf.write_u16::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<(), NetError> {
        self.ensure(4)?;
        self.buf.write_u32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<(), NetError> {
        self.ensure(4)?;
        self.buf.write_f32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn write_vec2(&mut self, v: Vec2) -> Result<(), NetError> {
        self.ensure(8)?;
        for c in v.to_array() {
            self.buf.write_f32::<LittleEndian>(c)?;
        }
        Ok(())
    }

    pub fn write_vec3(&mut self, v: Vec3) -> Result<(), NetError> {
        self.ensure(12)?;
        for c in v.to_array() {
            self.buf.write_f32::<LittleEndian>(c)?;
        }
        Ok(())
    }

    /// u16 length then UTF-8 bytes
    pub fn write_string(&mut self, s: &str) -> Result<(), NetError> {
        let len = u16::try_from(s.len()).map_err(|_| NetError::PacketFull {
            needed: s.len(),
            remaining: u16::MAX as usize,
        })?;
        self.ensure(2 + s.len())?;
        self.buf.write_u16::<LittleEndian>(len)?;
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    pub fn write_transform(&mut self, t: &Transform3x4) -> Result<(), NetError> {
        self.ensure(48)?;
        for c in t.to_array() {
            self.buf.write_f32::<LittleEndian>(c)?;
        }
        Ok(())
    }

    /// Position, width, depth, normal
    pub fn write_node(&mut self, node: &NodeRecord) -> Result<(), NetError> {
        self.ensure(NODE_RECORD_WIRE_SIZE)?;
        for c in node.position {
            self.buf.write_f32::<LittleEndian>(c)?;
        }
        self.buf.write_f32::<LittleEndian>(node.width)?;
        self.buf.write_f32::<LittleEndian>(node.depth)?;
        for c in node.normal {
            self.buf.write_f32::<LittleEndian>(c)?;
        }
        Ok(())
    }
}

/// Reader over a received packet; running out of bytes is [`NetError::Truncated`]
#[derive(Debug)]
pub struct PacketReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> PacketReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8, NetError> {
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16, NetError> {
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32, NetError> {
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32, NetError> {
        Ok(self.cursor.read_f32::<LittleEndian>()?)
    }

    pub fn read_vec2(&mut self) -> Result<Vec2, NetError> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3, NetError> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn read_string(&mut self) -> Result<String, NetError> {
        let len = self.read_u16()? as usize;
        let mut bytes = vec![0u8; len];
        self.cursor.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|_| NetError::InvalidString)
    }

    pub fn read_transform(&mut self) -> Result<Transform3x4, NetError> {
        let mut values = [0.0f32; 12];
        self.cursor.read_f32_into::<LittleEndian>(&mut values)?;
        Ok(Transform3x4::from_array(values))
    }

    pub fn read_node(&mut self) -> Result<NodeRecord, NetError> {
        let mut values = [0.0f32; 8];
        self.cursor.read_f32_into::<LittleEndian>(&mut values)?;
        Ok(NodeRecord::new(
            [values[0], values[1], values[2]],
            values[3],
            values[4],
            [values[5], values[6], values[7]],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_enforces_budget() {
        let mut w = PacketWriter::new(6);
        w.write_u32(7).unwrap();
        assert_eq!(w.remaining(), 2);
        assert!(matches!(
            w.write_f32(1.0),
            Err(NetError::PacketFull {
                needed: 4,
                remaining: 2
            })
        ));
        // Failed writes leave nothing behind
        assert_eq!(w.len(), 4);
        w.write_u16(9).unwrap();
        assert_eq!(w.remaining(), 0);
    }

    #[test]
    fn margin_check() {
        let w = PacketWriter::new(200).with_safety_margin(100);
        assert!(w.fits_with_margin(100));
        assert!(!w.fits_with_margin(101));
    }

    #[test]
    fn reads_back_what_was_written() {
        let node = NodeRecord::new([1.0, -2.5, 3.25], 8.0, 2.0, [0.0, 0.0, 1.0]);
        let transform = Transform3x4::from_translation([4.0, 5.0, 6.0]);

        let mut w = PacketWriter::default();
        w.write_u8(3).unwrap();
        w.write_string("Asphalt").unwrap();
        w.write_vec3(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        w.write_transform(&transform).unwrap();
        w.write_node(&node).unwrap();
        assert_eq!(w.len(), 1 + 2 + 7 + 12 + 48 + 32);

        let bytes = w.into_bytes();
        let mut r = PacketReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 3);
        assert_eq!(r.read_string().unwrap(), "Asphalt");
        assert_eq!(r.read_vec3().unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(r.read_transform().unwrap(), transform);
        assert!(r.read_node().unwrap().bits_eq(&node));
        assert!(r.is_empty());
    }

    #[test]
    fn short_input_is_truncated() {
        let mut r = PacketReader::new(&[1, 2]);
        assert!(matches!(r.read_u32(), Err(NetError::Truncated(_))));

        let mut r = PacketReader::new(&[2, 0, 0xff, 0xfe]);
        assert!(matches!(r.read_string(), Err(NetError::InvalidString)));
    }
}
