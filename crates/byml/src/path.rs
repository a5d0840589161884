//! Legacy path arrays.
//!
//! A path array is a list of point lists:
//!
//! ```text
//! u8   kind (0xC3, or 0 from some producers)
//! u24  list count
//! u32  offsets[count + 1]   relative to the path array start
//! ...  28-byte points, contiguous per list
//! ```

use crate::error::{Error, Result};
use crate::io::{MAX_U24, Reader, Writer};
use crate::kind::NodeKind;

/// Size of one encoded [`PathPoint`].
pub const POINT_SIZE: usize = 28;

/// One point of a path.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PathPoint {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub unused: u32,
}

impl PathPoint {
    fn read(r: &mut Reader<'_>) -> Result<Self> {
        let mut point = Self::default();
        for v in &mut point.position {
            *v = r.f32()?;
        }
        for v in &mut point.normal {
            *v = r.f32()?;
        }
        point.unused = r.u32()?;
        Ok(point)
    }

    fn write(&self, w: &mut Writer) -> Result<()> {
        for v in self.position.iter().chain(&self.normal) {
            w.f32(*v)?;
        }
        w.u32(self.unused)
    }
}

/// List of point lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathArray {
    paths: Vec<Vec<PathPoint>>,
}

impl PathArray {
    #[must_use]
    pub fn new(paths: Vec<Vec<PathPoint>>) -> Self {
        Self { paths }
    }

    /// Number of point lists.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Get the point list at `index`.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfBounds` if `index` is past the end.
    pub fn get(&self, index: usize) -> Result<&[PathPoint]> {
        self.paths
            .get(index)
            .map(Vec::as_slice)
            .ok_or(Error::IndexOutOfBounds {
                index,
                length: self.paths.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &[PathPoint]> {
        self.paths.iter().map(Vec::as_slice)
    }

    /// Append a point list.
    pub fn push(&mut self, points: Vec<PathPoint>) {
        self.paths.push(points);
    }

    /// Read a path array starting at the cursor.
    ///
    /// The leading kind byte is skipped without validation.
    /// On return the cursor sits at the end of the last point.
    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self> {
        let start = r.pos();
        r.u8()?;
        let count = r.u24()? as usize;
        let mut offsets = Vec::with_capacity(count + 1);
        for _ in 0..=count {
            offsets.push(r.u32()? as usize);
        }

        let mut paths = Vec::with_capacity(count);
        for pair in offsets.windows(2) {
            let span = pair[1].checked_sub(pair[0]).ok_or(Error::OutOfBounds {
                offset: start + pair[1],
                len: r.len(),
            })?;
            r.seek(start + pair[0]);
            let points = (0..span / POINT_SIZE)
                .map(|_| PathPoint::read(r))
                .collect::<Result<Vec<_>>>()?;
            paths.push(points);
        }
        r.seek(start + offsets[count]);

        Ok(Self { paths })
    }

    /// Encoded size in bytes.
    #[must_use]
    pub(crate) fn encoded_len(&self) -> usize {
        let points: usize = self.paths.iter().map(Vec::len).sum();
        4 + 4 * (self.paths.len() + 1) + points * POINT_SIZE
    }

    pub(crate) fn write(&self, w: &mut Writer) -> Result<()> {
        let count = self.paths.len();
        if count > MAX_U24 as usize {
            return Err(Error::TooManyEntries { count });
        }
        w.u8(NodeKind::PathArray.byte())?;
        w.u24(count as u32)?;

        let mut offset = 4 + 4 * (count + 1);
        for points in &self.paths {
            w.u32(offset as u32)?;
            offset += points.len() * POINT_SIZE;
        }
        w.u32(offset as u32)?;

        for point in self.paths.iter().flatten() {
            point.write(w)?;
        }
        Ok(())
    }
}
