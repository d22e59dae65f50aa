//! Math types for MeshRoad
//!
//! POD math types that travel over the wire and into persisted files
//! without pulling glam into every consumer.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// 3x4 affine object transform (row-major storage, POD type)
///
/// Stores the upper three rows of a 4x4 affine matrix; the implicit
/// fourth row is [0, 0, 0, 1]. Each row is [Xx, Xy, Xz, Tx] etc.
///
/// This is the form written into the MeshRoad section of a ghost update.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[repr(C)]
pub struct Transform3x4 {
    /// First row: [m00, m01, m02, tx]
    pub row0: [f32; 4],
    /// Second row: [m10, m11, m12, ty]
    pub row1: [f32; 4],
    /// Third row: [m20, m21, m22, tz]
    pub row2: [f32; 4],
}

impl Default for Transform3x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform3x4 {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        row0: [1.0, 0.0, 0.0, 0.0],
        row1: [0.0, 1.0, 0.0, 0.0],
        row2: [0.0, 0.0, 1.0, 0.0],
    };

    /// Create from row arrays
    pub const fn from_rows(row0: [f32; 4], row1: [f32; 4], row2: [f32; 4]) -> Self {
        Self { row0, row1, row2 }
    }

    /// Pure translation
    pub const fn from_translation(t: [f32; 3]) -> Self {
        Self {
            row0: [1.0, 0.0, 0.0, t[0]],
            row1: [0.0, 1.0, 0.0, t[1]],
            row2: [0.0, 0.0, 1.0, t[2]],
        }
    }

    /// Translation column
    pub fn translation(&self) -> [f32; 3] {
        [self.row0[3], self.row1[3], self.row2[3]]
    }

    /// Flatten to 12 floats in wire order (row-major)
    pub fn to_array(&self) -> [f32; 12] {
        let mut out = [0.0; 12];
        out[0..4].copy_from_slice(&self.row0);
        out[4..8].copy_from_slice(&self.row1);
        out[8..12].copy_from_slice(&self.row2);
        out
    }

    /// Rebuild from 12 floats in wire order (row-major)
    pub fn from_array(arr: [f32; 12]) -> Self {
        Self {
            row0: [arr[0], arr[1], arr[2], arr[3]],
            row1: [arr[4], arr[5], arr[6], arr[7]],
            row2: [arr[8], arr[9], arr[10], arr[11]],
        }
    }
}
