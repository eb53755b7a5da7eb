//! Reading and writing bitmaps in the portable roaring format
//!
//! The layout is shared with the other roaring implementations, all integers are little endian:
//!
//! ```text
//! no run containers:  cookie (12346) | count: u32 | [key: u16, cardinality - 1: u16] * count | [offset: u32] * count | payloads
//! with run containers: cookie (12347 | (count - 1) << 16) | run flags | [key, cardinality - 1] * count | [offset] * count if count >= 4 | payloads
//! ```

use std::io::{Read, Write};

use tracing::warn;

use crate::container::{ArrayContainer, BitsetContainer, Container, ContainerKind, RunContainer, DEFAULT_MAX_SIZE};
use crate::error::{DeserializeError, Error, Result};
use crate::roaring::RoaringBitmap;

/// Cookie of a bitmap without any run containers
const SERIAL_COOKIE_NO_RUNCONTAINER: u32 = 12346;

/// Cookie of a bitmap holding run containers, the upper 16 bits store the container count - 1
const SERIAL_COOKIE: u32 = 12347;

/// Bitmaps with run containers and fewer containers than this omit the offset table
const NO_OFFSET_THRESHOLD: usize = 4;

/// Largest number of containers a valid bitmap may hold
const MAX_CONTAINERS: u32 = 1 << 16;

/// The layout used when serializing a bitmap
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// The layout shared with the other roaring implementations.
    ///
    /// Run containers are written as runs, in which case the run flags are included in the header
    #[default]
    Portable,

    /// The layout without run container support.
    ///
    /// Run containers are written as array or bitset containers
    Legacy
}

impl RoaringBitmap {
    /// Get the number of bytes [`serialize`](RoaringBitmap::serialize) will write
    pub fn serialized_size(&self) -> usize {
        self.serialized_size_with_format(Format::Portable)
    }

    /// Get the number of bytes [`serialize_into`](RoaringBitmap::serialize_into) will write with `format`
    pub fn serialized_size_with_format(&self, format: Format) -> usize {
        let has_run = self.writes_runs(format);
        let count = self.containers.len();

        let payloads: usize = self.containers.iter()
            .map(|c| match c {
                Container::Run(r) if !has_run => legacy_size(r),
                c => c.serialized_size()
            })
            .sum();

        header_size(count, has_run) + payloads
    }

    /// Serialize the bitmap in the portable format. Returns the number of bytes written
    pub fn serialize<W: Write>(&self, buf: &mut W) -> Result<usize> {
        self.serialize_into(buf, Format::Portable)
    }

    /// Serialize the bitmap using `format`. Returns the number of bytes written
    pub fn serialize_into<W: Write>(&self, buf: &mut W, format: Format) -> Result<usize> {
        let has_run = self.writes_runs(format);
        let count = self.containers.len();

        let mut header = Vec::with_capacity(header_size(count, has_run));

        if has_run {
            let cookie = SERIAL_COOKIE | (((count - 1) as u32) << 16);
            header.extend_from_slice(&cookie.to_le_bytes());

            let mut flags = vec![0u8; (count + 7) / 8];
            for (i, container) in self.containers.iter().enumerate() {
                if container.kind() == ContainerKind::Run {
                    flags[i / 8] |= 1 << (i % 8);
                }
            }

            header.extend_from_slice(&flags);
        }
        else {
            header.extend_from_slice(&SERIAL_COOKIE_NO_RUNCONTAINER.to_le_bytes());
            header.extend_from_slice(&(count as u32).to_le_bytes());
        }

        // Descriptive header
        for (key, container) in self.keys.iter().zip(self.containers.iter()) {
            header.extend_from_slice(&key.to_le_bytes());
            header.extend_from_slice(&((container.cardinality() - 1) as u16).to_le_bytes());
        }

        // Offset table
        if !has_run || count >= NO_OFFSET_THRESHOLD {
            let mut offset = header_size(count, has_run);
            for container in self.containers.iter() {
                header.extend_from_slice(&(offset as u32).to_le_bytes());

                offset += match container {
                    Container::Run(r) if !has_run => legacy_size(r),
                    c => c.serialized_size()
                };
            }
        }

        buf.write_all(&header)?;
        let mut written = header.len();

        for container in self.containers.iter() {
            written += match container {
                Container::Run(r) if !has_run => {
                    if r.cardinality() <= DEFAULT_MAX_SIZE {
                        ArrayContainer::from(r).serialize(buf)?
                    }
                    else {
                        BitsetContainer::from(r).serialize(buf)?
                    }
                },
                c => c.serialize(buf)?
            };
        }

        Ok(written)
    }

    /// Read a bitmap written by [`serialize`](RoaringBitmap::serialize) or
    /// [`serialize_into`](RoaringBitmap::serialize_into) in either format.
    ///
    /// # Errors
    /// [`Error::CorruptData`] if the input is not a well formed bitmap. Partial results are never returned
    pub fn deserialize<R: Read>(buf: &mut R) -> Result<Self> {
        Self::deserialize_inner(buf)
            .map_err(|err| {
                if let Error::CorruptData(reason) = &err {
                    warn!(%reason, "rejected serialized bitmap");
                }

                err
            })
    }

    fn deserialize_inner<R: Read>(buf: &mut R) -> Result<Self> {
        let cookie = read_u32(buf)?;

        let (count, run_flags) = if cookie == SERIAL_COOKIE_NO_RUNCONTAINER {
            let count = read_u32(buf)?;
            if count > MAX_CONTAINERS {
                return Err(DeserializeError::InvalidContainerCount(count).into());
            }

            (count as usize, None)
        }
        else if cookie & 0xFFFF == SERIAL_COOKIE {
            let count = ((cookie >> 16) + 1) as usize;

            let mut flags = vec![0u8; (count + 7) / 8];
            buf.read_exact(&mut flags)?;

            (count, Some(flags))
        }
        else {
            return Err(DeserializeError::InvalidCookie(cookie).into());
        };

        let has_run = run_flags.is_some();
        let is_run = |i: usize| run_flags.as_ref()
            .map_or(false, |flags| flags[i / 8] & (1 << (i % 8)) != 0);

        // Descriptive header
        let mut description = vec![0u8; count * 4];
        buf.read_exact(&mut description)?;

        let mut keys = Vec::with_capacity(count);
        let mut cardinalities = Vec::with_capacity(count);
        for (index, entry) in description.chunks_exact(4).enumerate() {
            let key = u16::from_le_bytes([entry[0], entry[1]]);
            let cardinality = u32::from(u16::from_le_bytes([entry[2], entry[3]])) + 1;

            if keys.last().map_or(false, |last| *last >= key) {
                return Err(DeserializeError::UnsortedKeys { index, key }.into());
            }

            keys.push(key);
            cardinalities.push(cardinality);
        }

        // Offset table, only checked against the actual payload positions
        let offsets = if !has_run || count >= NO_OFFSET_THRESHOLD {
            let mut table = vec![0u8; count * 4];
            buf.read_exact(&mut table)?;

            table.chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        }
        else {
            Vec::new()
        };

        let mut position = header_size(count, has_run);
        let mut containers = Vec::with_capacity(count);

        for (index, &declared) in cardinalities.iter().enumerate() {
            if let Some(&found) = offsets.get(index) {
                if found as usize != position {
                    return Err(DeserializeError::InvalidOffset { index, found, expected: position as u32 }.into());
                }
            }

            let container = if is_run(index) {
                Container::Run(RunContainer::deserialize(buf)?)
            }
            else if declared as usize > DEFAULT_MAX_SIZE {
                Container::Bitset(BitsetContainer::deserialize(buf)?)
            }
            else {
                Container::Array(ArrayContainer::deserialize(buf, declared as usize)?)
            };

            let found = container.cardinality() as u32;
            if found != declared {
                return Err(DeserializeError::CardinalityMismatch { index, declared, found }.into());
            }

            if container.validate().is_err() {
                let reason = match container.kind() {
                    ContainerKind::Array => "array values are not strictly increasing",
                    ContainerKind::Bitset => "bitset holds too few values",
                    ContainerKind::Run => "runs overlap, touch, or overflow the container"
                };

                return Err(DeserializeError::InvalidContainer { index, reason }.into());
            }

            position += container.serialized_size();
            containers.push(container);
        }

        Ok(Self {
            containers,
            keys
        })
    }

    /// Check if the bitmap will be written with run containers
    fn writes_runs(&self, format: Format) -> bool {
        match format {
            Format::Portable => self.has_run(),
            Format::Legacy => false
        }
    }
}

/// Size of everything preceding the container payloads
fn header_size(count: usize, has_run: bool) -> usize {
    if has_run {
        let offsets = if count >= NO_OFFSET_THRESHOLD { 4 * count } else { 0 };

        4 + (count + 7) / 8 + 4 * count + offsets
    }
    else {
        8 + 8 * count
    }
}

/// Size of a run container written without run encoding
fn legacy_size(container: &RunContainer) -> usize {
    if container.cardinality() <= DEFAULT_MAX_SIZE {
        ArrayContainer::serialized_size(container.cardinality())
    }
    else {
        BitsetContainer::serialized_size()
    }
}

#[inline]
fn read_u32<R: Read>(buf: &mut R) -> Result<u32> {
    let mut bytes = [0; 4];
    buf.read_exact(&mut bytes)?;

    Ok(u32::from_le_bytes(bytes))
}

#[cfg(feature = "serde")]
mod serde_impl {
    use std::fmt;

    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::roaring::RoaringBitmap;

    impl Serialize for RoaringBitmap {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut bytes = Vec::with_capacity(self.serialized_size());
            self.serialize(&mut bytes)
                .map_err(serde::ser::Error::custom)?;

            serializer.serialize_bytes(&bytes)
        }
    }

    struct BitmapVisitor;

    impl<'de> Visitor<'de> for BitmapVisitor {
        type Value = RoaringBitmap;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a serialized roaring bitmap")
        }

        fn visit_bytes<E: de::Error>(self, mut bytes: &[u8]) -> Result<RoaringBitmap, E> {
            RoaringBitmap::deserialize(&mut bytes)
                .map_err(E::custom)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RoaringBitmap, A::Error> {
            let mut bytes: Vec<u8> = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(byte) = seq.next_element()? {
                bytes.push(byte);
            }

            self.visit_bytes(&bytes)
        }
    }

    impl<'de> Deserialize<'de> for RoaringBitmap {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_bytes(BitmapVisitor)
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{DeserializeError, Error, Format, RoaringBitmap};
    use crate::test::*;

    fn round_trip(bitmap: &RoaringBitmap, format: Format) -> RoaringBitmap {
        let mut bytes = Vec::new();
        let written = bitmap.serialize_into(&mut bytes, format).unwrap();

        assert_eq!(written, bytes.len());
        assert_eq!(written, bitmap.serialized_size_with_format(format));

        let result = RoaringBitmap::deserialize(&mut &bytes[..]).unwrap();
        result.validate().unwrap();

        result
    }

    fn fixtures() -> Vec<RoaringBitmap> {
        let mut runs = RoaringBitmap::from_range(0..200_000);
        runs.add_range(1_000_000..1_000_010);
        runs.add_range(5_000_000..5_010_000);
        runs.add(u32::MAX);

        vec![
            RoaringBitmap::new(),
            RoaringBitmap::from_slice(&[42]),
            RoaringBitmap::from_slice(&generate_data(0..u32::MAX, 50_000)),
            RoaringBitmap::from_slice(&generate_data(0..1_000_000, 300_000)),
            RoaringBitmap::from_range(70_000..72_000),
            runs
        ]
    }

    #[test]
    fn round_trip_serialize() {
        for bitmap in fixtures() {
            assert_eq!(round_trip(&bitmap, Format::Portable), bitmap);
            assert_eq!(round_trip(&bitmap, Format::Legacy), bitmap);
        }
    }

    #[test]
    fn portable_preserves_runs() {
        let bitmap = RoaringBitmap::from_range(0..200_000);
        let result = round_trip(&bitmap, Format::Portable);

        assert_eq!(result.statistics().run_containers, 4);

        let legacy = round_trip(&bitmap, Format::Legacy);
        assert_eq!(legacy.statistics().run_containers, 0);
        assert_eq!(legacy, bitmap);
    }

    #[test]
    fn empty_bitmap() {
        let mut bytes = Vec::new();
        RoaringBitmap::new().serialize(&mut bytes).unwrap();

        assert_eq!(bytes, vec![0x3A, 0x30, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn known_bytes() {
        // Two array containers without runs
        let bitmap = RoaringBitmap::from_slice(&[1, 2, 65_536 + 7]);
        let mut bytes = Vec::new();
        bitmap.serialize(&mut bytes).unwrap();

        let expected: Vec<u8> = vec![
            0x3A, 0x30, 0, 0,       // cookie
            2, 0, 0, 0,             // container count
            0, 0, 1, 0,             // key 0, 2 values
            1, 0, 0, 0,             // key 1, 1 value
            24, 0, 0, 0,            // offset of the first payload
            28, 0, 0, 0,            // offset of the second payload
            1, 0, 2, 0,             // values 1, 2
            7, 0                    // value 7
        ];

        assert_eq!(bytes, expected);

        // A single run container, no offsets below the threshold
        let bitmap = RoaringBitmap::from_range(10..=20);
        let mut bytes = Vec::new();
        bitmap.serialize(&mut bytes).unwrap();

        let expected: Vec<u8> = vec![
            0x3B, 0x30, 0, 0,       // cookie, count - 1 = 0
            1,                      // run flags
            0, 0, 10, 0,            // key 0, 11 values
            1, 0,                   // one run
            10, 0, 10, 0            // start 10, length - 1 = 10
        ];

        assert_eq!(bytes, expected);
    }

    #[test]
    fn rejects_bad_cookie() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let bytes = [0xFF, 0xFF, 0, 0, 0, 0, 0, 0];
        let result = RoaringBitmap::deserialize(&mut &bytes[..]);

        assert!(matches!(result, Err(Error::CorruptData(DeserializeError::InvalidCookie(0xFFFF)))));
    }

    #[test]
    fn rejects_truncated() {
        let bitmap = RoaringBitmap::from_slice(&generate_data(0..1_000_000, 10_000));
        let mut bytes = Vec::new();
        bitmap.serialize(&mut bytes).unwrap();

        for len in [0, 3, 7, 20, bytes.len() / 2, bytes.len() - 1] {
            let result = RoaringBitmap::deserialize(&mut &bytes[..len]);
            assert!(matches!(result, Err(Error::CorruptData(DeserializeError::Truncated))), "length {}", len);
        }
    }

    #[test]
    fn rejects_unsorted_keys() {
        let bitmap = RoaringBitmap::from_slice(&[1, 65_536]);
        let mut bytes = Vec::new();
        bitmap.serialize(&mut bytes).unwrap();

        // Swap the keys of the two containers
        bytes[8] = 1;
        bytes[12] = 0;

        let result = RoaringBitmap::deserialize(&mut &bytes[..]);
        assert!(matches!(result, Err(Error::CorruptData(DeserializeError::UnsortedKeys { index: 1, key: 0 }))));
    }

    #[test]
    fn rejects_bad_offset() {
        let bitmap = RoaringBitmap::from_slice(&[1, 65_536]);
        let mut bytes = Vec::new();
        bitmap.serialize(&mut bytes).unwrap();

        bytes[20] += 2;

        let result = RoaringBitmap::deserialize(&mut &bytes[..]);
        assert!(matches!(result, Err(Error::CorruptData(DeserializeError::InvalidOffset { index: 1, .. }))));
    }

    #[test]
    fn rejects_bad_containers() {
        // Array values out of order
        let bitmap = RoaringBitmap::from_slice(&[1, 2]);
        let mut bytes = Vec::new();
        bitmap.serialize(&mut bytes).unwrap();
        bytes.swap(16, 18);

        let result = RoaringBitmap::deserialize(&mut &bytes[..]);
        assert!(matches!(result, Err(Error::CorruptData(DeserializeError::InvalidContainer { index: 0, .. }))));

        // Overlapping runs declaring the right cardinality
        let bytes: Vec<u8> = vec![
            0x3B, 0x30, 0, 0,
            1,
            0, 0, 3, 0,             // 4 values
            2, 0,
            0, 0, 1, 0,             // [0, 1]
            1, 0, 1, 0              // [1, 2]
        ];

        let result = RoaringBitmap::deserialize(&mut &bytes[..]);
        assert!(matches!(result, Err(Error::CorruptData(DeserializeError::InvalidContainer { index: 0, .. }))));

        // Run cardinality disagreeing with the header
        let bytes: Vec<u8> = vec![
            0x3B, 0x30, 0, 0,
            1,
            0, 0, 5, 0,             // 6 values
            1, 0,
            0, 0, 1, 0              // [0, 1]
        ];

        let result = RoaringBitmap::deserialize(&mut &bytes[..]);
        assert!(matches!(result, Err(Error::CorruptData(DeserializeError::CardinalityMismatch { index: 0, declared: 6, found: 2 }))));
    }

    #[test]
    fn rejects_container_count() {
        let bytes = [0x3A, 0x30, 0, 0, 1, 0, 1, 0];
        let result = RoaringBitmap::deserialize(&mut &bytes[..]);

        assert!(matches!(result, Err(Error::CorruptData(DeserializeError::InvalidContainerCount(0x0001_0001)))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_json() {
        let bitmap = RoaringBitmap::from_slice(&generate_data(0..10_000_000, 20_000));

        let json = serde_json::to_string(&bitmap).unwrap();
        let result: RoaringBitmap = serde_json::from_str(&json).unwrap();

        assert_eq!(result, bitmap);
    }
}
