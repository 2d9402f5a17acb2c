use std::path::Path;

use vultra_types::{write_file_atomic, Error, Result, ShaderStage};

/// First eight bytes of every `.vshlib`.
pub const VSHLIB_MAGIC: [u8; 8] = *b"VSHLIB\0\0";

/// Current format version.
pub const VSHLIB_VERSION: u32 = 2;

/// Size of the fixed header: magic + version/flags/entryCount/reserved +
/// four u64 region fields. The blob region starts here.
pub const VSHLIB_HEADER_LEN: usize = 8 + 4 * 4 + 8 * 4;

const TOC_ENTRY_LEN: usize = 32;

/// One entry to be packed into a library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderLibraryEntry {
    pub key_hash: u64,
    pub stage: ShaderStage,
    /// Typically a full `.vshbin` image.
    pub blob: Vec<u8>,
}

/// One decoded table-of-contents record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    pub key_hash: u64,
    pub stage: ShaderStage,
    /// Absolute file offset of the blob.
    pub offset: u64,
    pub size: u64,
}

/// A decoded library: TOC plus the raw blob region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderLibrary {
    /// Sorted by `(key_hash, stage)`.
    pub entries: Vec<TocEntry>,
    /// The contiguous blob region (file bytes `[header_len, toc_offset)`).
    pub blob_data: Vec<u8>,
    /// Embedded engine-keywords file bytes, empty when absent.
    pub engine_keywords: Vec<u8>,
}

impl ShaderLibrary {
    /// Find the first entry matching `(key_hash, stage)` and return its blob.
    pub fn lookup(&self, key_hash: u64, stage: ShaderStage) -> Result<&[u8]> {
        for entry in &self.entries {
            if entry.key_hash == key_hash && entry.stage == stage {
                let rel = entry
                    .offset
                    .checked_sub(VSHLIB_HEADER_LEN as u64)
                    .ok_or_else(|| Error::deserialize("VSHLIB entry offset before blob region"))?;
                let end = rel
                    .checked_add(entry.size)
                    .filter(|&end| end <= self.blob_data.len() as u64)
                    .ok_or_else(|| Error::deserialize("VSHLIB entry out of range"))?;
                return Ok(&self.blob_data[rel as usize..end as usize]);
            }
        }
        Err(Error::io("entry not found"))
    }
}

/// Serialise a library image.
///
/// Entries are sorted by `(keyHash, stage)`; every entry must carry an
/// encodable stage and a non-zero key hash.
pub fn encode_vshlib(
    entries: &[ShaderLibraryEntry],
    engine_keywords: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut sorted: Vec<&ShaderLibraryEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| (e.key_hash, e.stage as u8));

    let mut toc = Vec::with_capacity(sorted.len());
    let mut blob_data = Vec::new();
    let mut blob_offset = VSHLIB_HEADER_LEN as u64;

    for entry in &sorted {
        let stage_index = entry.stage.wire_index().ok_or_else(|| {
            Error::invalid_argument("VSHLIB entry has unknown shader stage")
        })?;
        if entry.key_hash == 0 {
            return Err(Error::invalid_argument(
                "VSHLIB entry has keyHash=0 (reserved)",
            ));
        }

        toc.push((entry.key_hash, stage_index, blob_offset, entry.blob.len() as u64));
        blob_data.extend_from_slice(&entry.blob);
        blob_offset += entry.blob.len() as u64;
    }

    let toc_offset = VSHLIB_HEADER_LEN as u64 + blob_data.len() as u64;
    let toc_size = (toc.len() * TOC_ENTRY_LEN) as u64;

    let keywords = engine_keywords.filter(|bytes| !bytes.is_empty());
    let keywords_size = keywords.map_or(0, |bytes| bytes.len() as u64);
    let keywords_offset = if keywords_size > 0 {
        toc_offset + toc_size
    } else {
        0
    };

    let mut out =
        Vec::with_capacity(VSHLIB_HEADER_LEN + blob_data.len() + toc_size as usize + keywords_size as usize);
    out.extend_from_slice(&VSHLIB_MAGIC);
    out.extend_from_slice(&VSHLIB_VERSION.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // flags
    out.extend_from_slice(&(toc.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // reserved0
    out.extend_from_slice(&toc_offset.to_le_bytes());
    out.extend_from_slice(&toc_size.to_le_bytes());
    out.extend_from_slice(&keywords_offset.to_le_bytes());
    out.extend_from_slice(&keywords_size.to_le_bytes());
    debug_assert_eq!(out.len(), VSHLIB_HEADER_LEN);

    out.extend_from_slice(&blob_data);

    for (key_hash, stage_index, offset, size) in toc {
        out.extend_from_slice(&key_hash.to_le_bytes());
        out.push(stage_index);
        out.extend_from_slice(&[0u8; 7]);
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
    }

    if let Some(bytes) = keywords {
        out.extend_from_slice(bytes);
    }

    Ok(out)
}

fn read_u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().expect("checked length"))
}

fn read_u64_at(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(bytes[offset..offset + 8].try_into().expect("checked length"))
}

/// Decode a library image.
pub fn decode_vshlib(bytes: &[u8]) -> Result<ShaderLibrary> {
    if bytes.len() < VSHLIB_HEADER_LEN {
        return Err(Error::deserialize("file too small to be a valid .vshlib"));
    }
    if bytes[0..8] != VSHLIB_MAGIC {
        return Err(Error::deserialize("invalid VSHLIB magic"));
    }

    let version = read_u32_at(bytes, 8);
    if version != VSHLIB_VERSION {
        return Err(Error::deserialize(format!(
            "unsupported VSHLIB version {version}"
        )));
    }

    let entry_count = read_u32_at(bytes, 16) as u64;
    let toc_offset = read_u64_at(bytes, 24);
    let toc_size = read_u64_at(bytes, 32);
    let keywords_offset = read_u64_at(bytes, 40);
    let keywords_size = read_u64_at(bytes, 48);

    let file_size = bytes.len() as u64;

    let toc_end = toc_offset
        .checked_add(toc_size)
        .filter(|&end| end <= file_size)
        .ok_or_else(|| Error::deserialize("VSHLIB TOC out of file range"))?;
    if toc_offset < VSHLIB_HEADER_LEN as u64 {
        return Err(Error::deserialize("VSHLIB TOC overlaps header"));
    }
    if toc_size != entry_count * TOC_ENTRY_LEN as u64 {
        return Err(Error::deserialize("VSHLIB TOC size does not match entry count"));
    }

    if keywords_offset != 0 {
        let keywords_end = keywords_offset
            .checked_add(keywords_size)
            .filter(|&end| end <= file_size)
            .ok_or_else(|| Error::deserialize("VSHLIB keywords region out of file range"))?;
        let _ = keywords_end;
        if keywords_offset < toc_end {
            return Err(Error::deserialize("VSHLIB keywords region overlaps TOC"));
        }
    }

    let blob_begin = VSHLIB_HEADER_LEN as u64;
    let blob_data = bytes[blob_begin as usize..toc_offset as usize].to_vec();

    let mut entries = Vec::with_capacity(entry_count.min(4096) as usize);
    let toc_bytes = &bytes[toc_offset as usize..toc_end as usize];
    for record in toc_bytes.chunks_exact(TOC_ENTRY_LEN) {
        let key_hash = read_u64_at(record, 0);
        let stage_byte = record[8];
        let stage = ShaderStage::from_wire_index(stage_byte).ok_or_else(|| {
            Error::deserialize(format!("VSHLIB entry has invalid stage {stage_byte}"))
        })?;
        let offset = read_u64_at(record, 16);
        let size = read_u64_at(record, 24);

        if offset < blob_begin
            || offset
                .checked_add(size)
                .map_or(true, |end| end > toc_offset)
        {
            return Err(Error::deserialize("VSHLIB entry blob out of range"));
        }

        entries.push(TocEntry {
            key_hash,
            stage,
            offset,
            size,
        });
    }

    let engine_keywords = if keywords_offset != 0 && keywords_size > 0 {
        bytes[keywords_offset as usize..(keywords_offset + keywords_size) as usize].to_vec()
    } else {
        Vec::new()
    };

    Ok(ShaderLibrary {
        entries,
        blob_data,
        engine_keywords,
    })
}

/// Encode and write atomically.
pub fn write_vshlib_file(
    path: &Path,
    entries: &[ShaderLibraryEntry],
    engine_keywords: Option<&[u8]>,
) -> Result<()> {
    let bytes = encode_vshlib(entries, engine_keywords)?;
    write_file_atomic(path, &bytes)
}

/// Read and decode a `.vshlib` file.
pub fn read_vshlib_file(path: &Path) -> Result<ShaderLibrary> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::io(format!("failed to read {}: {e}", path.display())))?;
    decode_vshlib(&bytes)
}
