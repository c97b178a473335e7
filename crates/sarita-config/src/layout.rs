//! Binary geometry layout.
//!
//! Little-endian. A header of nine 4-byte fields followed by seven arrays,
//! each row-major:
//!
//! | # | Field | Type | Shape |
//! |---|-------|------|-------|
//! | header | `fs`, `N`, `N_upsampling` | u32 | |
//! | header | `radius` | f32 | |
//! | header | `dense`, `max_shift_overall`, `comb_len`, `list_len`, `ptr_len` | u32 | |
//! | 1 | neighbour combinations (1-based) | u8 | `[comb_len][2]` |
//! | 2 | neighbours per dense point | u8 | `[dense]` |
//! | 3 | neighbour indices (1-based) | u8 | `[list_len][dense]` |
//! | 4 | neighbour weights | f32 | `[list_len][dense]` |
//! | 5 | max shift per neighbour | u8 | `[list_len - 1][dense]` |
//! | 6 | combination pointer (1-based slot, -1 = reversed) | i8 | `[ptr_len][2]` |
//! | 7 | dense grid (azimuth, elevation, weight) | f32 | `[3][dense]` |
//!
//! Tables 3, 4, 5 and 7 are transposed on load to `[dense][slot]`. Unused
//! neighbour slots may hold any value; used ones must be non-zero. Trailing
//! bytes are ignored.

use crate::error::ConfigError;
use crate::geometry::{
    CombinationRef, DenseDirection, Geometry, GeometryHeader, GeometryTables, MAX_SENSORS,
};
use crate::validation::ValidationError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use sarita_core::Matrix;
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

/// File extension used for geometry files.
pub const GEOMETRY_EXTENSION: &str = "cfg";

const HEADER_BYTES: usize = 9 * 4;

struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.cursor.position() as usize)
    }

    /// Fails before allocating when fewer than `rows * cols * width` bytes remain.
    fn ensure(
        &self,
        rows: usize,
        cols: usize,
        width: usize,
        section: &'static str,
    ) -> Result<(), ConfigError> {
        match rows.checked_mul(cols).and_then(|n| n.checked_mul(width)) {
            Some(bytes) if bytes <= self.remaining() => Ok(()),
            _ => Err(ConfigError::truncated(section)),
        }
    }

    fn u32(&mut self, section: &'static str) -> Result<usize, ConfigError> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map(|v| v as usize)
            .map_err(|_| ConfigError::truncated(section))
    }

    fn f32(&mut self, section: &'static str) -> Result<f32, ConfigError> {
        self.cursor
            .read_f32::<LittleEndian>()
            .map_err(|_| ConfigError::truncated(section))
    }

    fn u8_matrix(
        &mut self,
        rows: usize,
        cols: usize,
        section: &'static str,
    ) -> Result<Matrix<u8>, ConfigError> {
        self.ensure(rows, cols, 1, section)?;
        let mut buf = vec![0u8; rows * cols];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| ConfigError::truncated(section))?;
        Matrix::from_row_major(rows, cols, buf).ok_or(ConfigError::truncated(section))
    }

    fn i8_matrix(
        &mut self,
        rows: usize,
        cols: usize,
        section: &'static str,
    ) -> Result<Matrix<i8>, ConfigError> {
        self.ensure(rows, cols, 1, section)?;
        let mut buf = vec![0i8; rows * cols];
        self.cursor
            .read_i8_into(&mut buf)
            .map_err(|_| ConfigError::truncated(section))?;
        Matrix::from_row_major(rows, cols, buf).ok_or(ConfigError::truncated(section))
    }

    fn f32_matrix(
        &mut self,
        rows: usize,
        cols: usize,
        section: &'static str,
    ) -> Result<Matrix<f32>, ConfigError> {
        self.ensure(rows, cols, 4, section)?;
        let mut buf = vec![0f32; rows * cols];
        self.cursor
            .read_f32_into::<LittleEndian>(&mut buf)
            .map_err(|_| ConfigError::truncated(section))?;
        Matrix::from_row_major(rows, cols, buf).ok_or(ConfigError::truncated(section))
    }
}

impl Geometry {
    /// Parses the binary layout.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ConfigError> {
        let mut r = Reader::new(data);
        if data.len() < HEADER_BYTES {
            return Err(ConfigError::truncated("header"));
        }

        let sample_rate = r.u32("header")? as u32;
        let source_order = r.u32("header")? as u32;
        let target_order = r.u32("header")? as u32;
        let radius = r.f32("header")?;
        let dense = r.u32("header")?;
        let max_shift_overall = r.u32("header")?;
        let comb_len = r.u32("header")?;
        let list_len = r.u32("header")?;
        let ptr_len = r.u32("header")?;

        if dense > MAX_SENSORS {
            return Err(ConfigError::GridTooLarge {
                size: dense,
                max: MAX_SENSORS,
            });
        }
        if dense == 0 {
            return Err(ValidationError::EmptyGrid.into());
        }
        if list_len == 0 {
            return Err(ValidationError::ShapeMismatch {
                table: "neighbor_indices",
                expected: dense,
                found: 0,
            }
            .into());
        }

        let raw_combinations = r.u8_matrix(comb_len, 2, "neighbor combinations")?;
        let raw_counts = r.u8_matrix(1, dense, "neighbor counts")?;
        let raw_indices = r.u8_matrix(list_len, dense, "neighbor indices")?;
        let raw_weights = r.f32_matrix(list_len, dense, "neighbor weights")?;
        let raw_shifts = r.u8_matrix(list_len - 1, dense, "max shift")?;
        let raw_pointers = r.i8_matrix(ptr_len, 2, "combination pointers")?;
        let raw_grid = r.f32_matrix(3, dense, "dense grid")?;

        let mut combinations = Vec::with_capacity(comb_len);
        for (i, pair) in raw_combinations.iter_rows().enumerate() {
            combinations.push((
                one_based(pair[0], "neighbor combinations", 2 * i)?,
                one_based(pair[1], "neighbor combinations", 2 * i + 1)?,
            ));
        }

        let num_neighbors: Vec<usize> = raw_counts.row(0).iter().map(|&n| n as usize).collect();

        let indices_t = raw_indices.transposed();
        let mut neighbor_indices = Matrix::new(dense, list_len);
        for d in 0..dense {
            for j in 0..list_len {
                let raw = *indices_t.get(d, j);
                // unused slots may be zero-padded
                *neighbor_indices.get_mut(d, j) = if j < num_neighbors[d] {
                    one_based(raw, "neighbor indices", j * dense + d)?
                } else {
                    (raw as usize).saturating_sub(1)
                };
            }
        }

        let neighbor_weights = raw_weights.transposed();
        let shifts_t = raw_shifts.transposed();
        let mut max_shift = Matrix::new(dense, list_len - 1);
        for d in 0..dense {
            for (dst, &src) in max_shift.row_mut(d).iter_mut().zip(shifts_t.row(d)) {
                *dst = src as usize;
            }
        }

        let mut combination_refs = Vec::with_capacity(ptr_len);
        for (entry, ptr) in raw_pointers.iter_rows().enumerate() {
            let slot = ptr[0];
            if slot <= 0 {
                return Err(ValidationError::ZeroIndex {
                    table: "combination pointers",
                    position: 2 * entry,
                }
                .into());
            }
            let reversed = match ptr[1] {
                -1 => true,
                0 | 1 => false,
                flag => return Err(ValidationError::InvalidReverseFlag { entry, flag }.into()),
            };
            combination_refs.push(CombinationRef {
                slot: slot as usize - 1,
                reversed,
            });
        }

        let directions = (0..dense)
            .map(|d| DenseDirection {
                azimuth: *raw_grid.get(0, d),
                elevation: *raw_grid.get(1, d),
                weight: *raw_grid.get(2, d),
            })
            .collect();

        if r.remaining() > 0 {
            tracing::debug!(trailing = r.remaining(), "ignoring trailing geometry bytes");
        }

        let header = GeometryHeader {
            sample_rate,
            source_order,
            target_order,
            radius,
            max_shift_overall,
        };
        let tables = GeometryTables {
            combinations,
            num_neighbors,
            neighbor_indices,
            neighbor_weights,
            max_shift,
            combination_refs,
            directions,
        };
        Geometry::from_tables(header, tables).map_err(ConfigError::from)
    }

    /// Reads and parses a geometry file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| ConfigError::read_file(path, e))?;
        let geometry = Self::from_bytes(&data)?;
        tracing::info!(
            path = %path.display(),
            dense = geometry.dense_grid_size(),
            sparse = geometry.sparse_channels(),
            max_shift = geometry.max_shift_overall(),
            "geometry loaded"
        );
        Ok(geometry)
    }

    /// Serializes to the binary layout.
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(
            HEADER_BYTES + self.dense_grid_size() * self.neighbor_list_len() * 6,
        );
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Writes the binary layout to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let dense = self.dense_grid_size();
        let list_len = self.neighbor_list_len();
        let tables = self.tables();

        w.write_u32::<LittleEndian>(self.sample_rate())?;
        w.write_u32::<LittleEndian>(self.source_order())?;
        w.write_u32::<LittleEndian>(self.target_order())?;
        w.write_f32::<LittleEndian>(self.radius())?;
        w.write_u32::<LittleEndian>(dense as u32)?;
        w.write_u32::<LittleEndian>(self.max_shift_overall() as u32)?;
        w.write_u32::<LittleEndian>(self.combinations().len() as u32)?;
        w.write_u32::<LittleEndian>(list_len as u32)?;
        w.write_u32::<LittleEndian>(self.combination_refs().len() as u32)?;

        for &(a, b) in self.combinations() {
            w.write_u8((a + 1) as u8)?;
            w.write_u8((b + 1) as u8)?;
        }
        for &n in tables.num_neighbors.iter() {
            w.write_u8(n as u8)?;
        }

        for j in 0..list_len {
            for d in 0..dense {
                let index = if j < self.num_neighbors(d) {
                    (*tables.neighbor_indices.get(d, j) + 1) as u8
                } else {
                    0
                };
                w.write_u8(index)?;
            }
        }
        for j in 0..list_len {
            for d in 0..dense {
                w.write_f32::<LittleEndian>(*tables.neighbor_weights.get(d, j))?;
            }
        }
        for j in 0..list_len.saturating_sub(1) {
            for d in 0..dense {
                w.write_u8(*tables.max_shift.get(d, j) as u8)?;
            }
        }
        for r in self.combination_refs() {
            w.write_u8((r.slot + 1) as u8)?;
            w.write_i8(if r.reversed { -1 } else { 1 })?;
        }
        for field in 0..3 {
            for dir in self.directions() {
                let v = match field {
                    0 => dir.azimuth,
                    1 => dir.elevation,
                    _ => dir.weight,
                };
                w.write_f32::<LittleEndian>(v)?;
            }
        }
        Ok(())
    }

    /// Writes the binary layout to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let file = std::fs::File::create(path).map_err(|e| ConfigError::write_file(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)
            .and_then(|()| writer.flush())
            .map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }
}

fn one_based(raw: u8, table: &'static str, position: usize) -> Result<usize, ValidationError> {
    if raw == 0 {
        Err(ValidationError::ZeroIndex { table, position })
    } else {
        Ok(raw as usize - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{DensePoint, GeometryBuilder};

    fn sample() -> Geometry {
        GeometryBuilder::new(48000)
            .orders(1, 3)
            .radius(0.042)
            .max_shift_overall(5)
            .point(DensePoint::new(0.1, 0.2, 0.3).neighbor(0, 1.0))
            .point(
                DensePoint::new(0.4, 0.5, 0.6)
                    .neighbor(2, 0.25)
                    .neighbor(0, 0.25)
                    .neighbor_with_shift(1, 0.5, 2),
            )
            .point(DensePoint::new(0.7, 0.8, 0.9).neighbor(0, 0.5).neighbor(2, 0.5))
            .build()
            .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let g = sample();
        let bytes = g.to_bytes().unwrap();
        let parsed = Geometry::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.combinations(), g.combinations());
        assert_eq!(parsed.neighbors(1), &[2, 0, 1]);
        assert_eq!(parsed.weights(1), &[0.25, 0.25, 0.5]);
        assert_eq!(parsed.max_shift(1, 2), 2);
        assert_eq!(parsed.combination_refs(), g.combination_refs());
        assert_eq!(parsed.directions(), g.directions());
        assert_eq!(parsed.radius(), 0.042);
        assert_eq!(parsed.target_order(), 3);
    }

    #[test]
    fn test_header_layout() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(&bytes[0..4], &48000u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &3u32.to_le_bytes()); // dense
        assert_eq!(&bytes[20..24], &5u32.to_le_bytes()); // max shift
        assert_eq!(&bytes[28..32], &3u32.to_le_bytes()); // list len
    }

    #[test]
    fn test_truncated_sections() {
        let bytes = sample().to_bytes().unwrap();
        assert!(matches!(
            Geometry::from_bytes(&bytes[..20]),
            Err(ConfigError::Truncated { section: "header" })
        ));
        assert!(matches!(
            Geometry::from_bytes(&bytes[..bytes.len() - 1]),
            Err(ConfigError::Truncated {
                section: "dense grid"
            })
        ));
    }

    #[test]
    fn test_grid_too_large() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[16..20].copy_from_slice(&65u32.to_le_bytes());
        assert!(matches!(
            Geometry::from_bytes(&bytes),
            Err(ConfigError::GridTooLarge { size: 65, max: 64 })
        ));
    }

    #[test]
    fn test_huge_lengths_do_not_allocate() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[24..28].copy_from_slice(&u32::MAX.to_le_bytes()); // comb_len
        assert!(matches!(
            Geometry::from_bytes(&bytes),
            Err(ConfigError::Truncated { .. })
        ));
    }

    #[test]
    fn test_invalid_reverse_flag() {
        let g = sample();
        let mut bytes = g.to_bytes().unwrap();
        let grid_bytes = 3 * g.dense_grid_size() * 4;
        let flag_pos = bytes.len() - grid_bytes - 1;
        bytes[flag_pos] = 7;
        assert!(matches!(
            Geometry::from_bytes(&bytes),
            Err(ConfigError::Validation(ValidationError::InvalidReverseFlag { flag: 7, .. }))
        ));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes.extend_from_slice(&[0xAB; 16]);
        assert!(Geometry::from_bytes(&bytes).is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arrays").join("test.cfg");
        let g = sample();
        g.save(&path).unwrap();
        let loaded = Geometry::load(&path).unwrap();
        assert_eq!(loaded.dense_grid_size(), 3);
        assert_eq!(loaded.sparse_channels(), 3);
        assert_eq!(std::fs::read(&path).unwrap(), g.to_bytes().unwrap());
    }

    #[test]
    fn test_write_to_short_sink_fails() {
        let mut buf = [0u8; 8];
        let mut sink = &mut buf[..];
        assert!(sample().write_to(&mut sink).is_err());
        assert_eq!(&buf[0..4], &48000u32.to_le_bytes());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Geometry::load("/nonexistent/array.cfg").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
