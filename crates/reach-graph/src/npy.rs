//! Minimal NPY v1.0 codec for the graph cache.
//!
//! The cache stores one flat little-endian array per file so downstream
//! stages (and external tooling) can memory-map columns without a
//! deserialization pass.  Only the subset of the format the cache needs is
//! implemented: 1-D, C-order, little-endian `i64`/`i32`/`u64`/`u32`/`u16`/`f32`.
//!
//! Writes go to a `.tmp` sibling and are renamed into place so readers never
//! observe a partial file.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{GraphError, GraphResult};

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Element types the codec understands, keyed by their numpy descr string.
pub trait Element: Copy + 'static {
    const DESCR: &'static str;
}

impl Element for i64 {
    const DESCR: &'static str = "<i8";
}
impl Element for u64 {
    const DESCR: &'static str = "<u8";
}
impl Element for i32 {
    const DESCR: &'static str = "<i4";
}
impl Element for u32 {
    const DESCR: &'static str = "<u4";
}
impl Element for u16 {
    const DESCR: &'static str = "<u2";
}
impl Element for f32 {
    const DESCR: &'static str = "<f4";
}

fn header_bytes<T: Element>(len: usize) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({},), }}",
        T::DESCR,
        len
    );
    // Pad with spaces so magic + version + header-len + dict + '\n' is a
    // multiple of 64 — this also 64-byte-aligns the data section for the
    // mmap cast on the read side.
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (64 - unpadded % 64) % 64;

    let mut out = Vec::with_capacity(unpadded + padding);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[0x01, 0x00]); // format version 1.0
    let header_len = (dict.len() + padding + 1) as u16;
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.extend(std::iter::repeat_n(b' ', padding));
    out.push(b'\n');
    out
}

/// Write `values` to `path` atomically as a 1-D NPY array.
pub fn write_npy<T: Element>(path: &Path, values: &[T]) -> GraphResult<()> {
    let tmp = path.with_extension("npy.tmp");
    {
        let mut f = File::create(&tmp)?;
        f.write_all(&header_bytes::<T>(values.len()))?;
        // Safety: T is a plain little-endian integer/float; on every target
        // this crate supports, the in-memory representation is the wire
        // representation.
        let bytes = unsafe {
            std::slice::from_raw_parts(values.as_ptr().cast::<u8>(), std::mem::size_of_val(values))
        };
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Parse the header, returning `(data_offset, element_count)`.
fn parse_header<T: Element>(path: &Path, buf: &[u8]) -> GraphResult<(usize, usize)> {
    let bad = |msg: &str| GraphError::Npy(format!("{}: {msg}", path.display()));

    if buf.len() < 10 || &buf[..6] != MAGIC {
        return Err(bad("not an NPY file"));
    }
    if buf[6] != 1 {
        return Err(bad("unsupported NPY version"));
    }
    let header_len = u16::from_le_bytes([buf[8], buf[9]]) as usize;
    let data_offset = 10 + header_len;
    if buf.len() < data_offset {
        return Err(bad("truncated header"));
    }
    let dict = std::str::from_utf8(&buf[10..data_offset]).map_err(|_| bad("non-ASCII header"))?;

    if !dict.contains(&format!("'descr': '{}'", T::DESCR)) {
        return Err(bad(&format!("dtype mismatch, expected {}", T::DESCR)));
    }
    if !dict.contains("'fortran_order': False") {
        return Err(bad("fortran order unsupported"));
    }
    let shape = dict
        .split("'shape': (")
        .nth(1)
        .and_then(|s| s.split(&[',', ')'][..]).next())
        .ok_or_else(|| bad("missing shape"))?;
    let len: usize = shape
        .trim()
        .parse()
        .map_err(|_| bad("non-scalar shape"))?;

    Ok((data_offset, len))
}

/// A 1-D NPY array memory-mapped from disk.
///
/// The mapping is kept alive for the lifetime of the value; `as_slice`
/// reinterprets the data section in place (the writer guarantees 64-byte
/// alignment of the data offset).
pub struct MappedArray<T: Element> {
    map: Mmap,
    offset: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T: Element> MappedArray<T> {
    pub fn open(path: &Path) -> GraphResult<Self> {
        let file = File::open(path)?;
        // Safety: cache files are write-once (tmp + rename) and never
        // mutated while readers are open — the lifecycle contract for every
        // artifact in this pipeline.
        let map = unsafe { Mmap::map(&file)? };
        let (offset, len) = parse_header::<T>(path, &map)?;
        let expected = offset + len * std::mem::size_of::<T>();
        if map.len() < expected {
            return Err(GraphError::Npy(format!(
                "{}: truncated data ({} < {expected} bytes)",
                path.display(),
                map.len()
            )));
        }
        if map.as_ptr().wrapping_add(offset).align_offset(std::mem::align_of::<T>()) != 0 {
            return Err(GraphError::Npy(format!("{}: misaligned data", path.display())));
        }
        Ok(Self {
            map,
            offset,
            len,
            _marker: PhantomData,
        })
    }

    pub fn as_slice(&self) -> &[T] {
        // Safety: bounds and alignment were validated in `open`.
        unsafe {
            std::slice::from_raw_parts(self.map.as_ptr().add(self.offset).cast::<T>(), self.len)
        }
    }
}

/// A typed column that is either owned (freshly built) or memory-mapped
/// (loaded from cache).  Dereferences to `&[T]` either way.
pub enum Column<T: Element> {
    Owned(Vec<T>),
    Mapped(MappedArray<T>),
}

impl<T: Element> Column<T> {
    pub fn open(path: &Path) -> GraphResult<Self> {
        Ok(Column::Mapped(MappedArray::open(path)?))
    }
}

impl<T: Element> std::ops::Deref for Column<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match self {
            Column::Owned(v) => v,
            Column::Mapped(m) => m.as_slice(),
        }
    }
}

impl<T: Element> From<Vec<T>> for Column<T> {
    fn from(v: Vec<T>) -> Self {
        Column::Owned(v)
    }
}

/// Eagerly read a whole array (used by tests and small sidecar files).
pub fn read_npy<T: Element>(path: &Path) -> GraphResult<Vec<T>> {
    let mut buf = Vec::new();
    File::open(path)?.read_to_end(&mut buf)?;
    let (offset, len) = parse_header::<T>(path, &buf)?;
    let size = std::mem::size_of::<T>();
    if buf.len() < offset + len * size {
        return Err(GraphError::Npy(format!("{}: truncated data", path.display())));
    }
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let chunk = &buf[offset + i * size..offset + (i + 1) * size];
        // Safety: chunk is exactly size_of::<T>() little-endian bytes.
        out.push(unsafe { std::ptr::read_unaligned(chunk.as_ptr().cast::<T>()) });
    }
    Ok(out)
}
