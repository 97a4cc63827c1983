use crate::error::EmbeddedDateError;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use exif::{Exif, In, Reader, Tag, Value};
use std::io::{BufRead, Seek};

/// Bytes needed to classify a file.
pub const SNIFF_LEN: usize = 64;

const HEIF_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"mif1", b"msf1",
];

/// Capture-date tags in order of preference, each paired with its offset tag.
const DATE_TAGS: &[(Tag, Tag)] = &[
    (Tag::DateTimeOriginal, Tag::OffsetTimeOriginal),
    (Tag::DateTimeDigitized, Tag::OffsetTimeDigitized),
    (Tag::DateTime, Tag::OffsetTime),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Heif,
}

/// Classifies a file from its leading bytes, ignoring the extension.
pub fn sniff_image_kind(header: &[u8]) -> Option<ImageKind> {
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageKind::Jpeg);
    }
    if is_heif(header) {
        return Some(ImageKind::Heif);
    }
    None
}

fn is_heif(header: &[u8]) -> bool {
    if header.len() < 12 || &header[4..8] != b"ftyp" {
        return false;
    }
    let box_len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let end = box_len.min(header.len());

    let is_heif_brand = |brand: &[u8]| HEIF_BRANDS.iter().any(|b| b.as_slice() == brand);
    if is_heif_brand(&header[8..12]) {
        return true;
    }
    // compatible brands follow the 4-byte minor version
    header
        .get(16..end)
        .map(|brands| brands.chunks_exact(4).any(is_heif_brand))
        .unwrap_or(false)
}

pub fn read_embedded_date<R: BufRead + Seek>(
    reader: &mut R,
) -> Result<DateTime<Local>, EmbeddedDateError> {
    let exif = Reader::new()
        .read_from_container(reader)
        .map_err(|err| EmbeddedDateError::Exif(err.to_string()))?;

    let mut last_err = EmbeddedDateError::Missing;
    for (date_tag, offset_tag) in DATE_TAGS {
        let Some(raw) = ascii_field(&exif, *date_tag) else {
            continue;
        };
        let offset = ascii_field(&exif, *offset_tag);
        match parse_date(&raw, offset.as_deref()) {
            Some(date) => return Ok(date),
            None => last_err = EmbeddedDateError::Unparseable(raw),
        }
    }
    Err(last_err)
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(values) => values
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
            .filter(|v| !v.is_empty()),
        _ => None,
    }
}

/// Parses an EXIF date-time. Without an offset the value is taken as local time.
fn parse_date(input: &str, offset: Option<&str>) -> Option<DateTime<Local>> {
    let normalized = input.trim_end_matches('\0').trim();

    if let Some(offset) = offset.map(str::trim).filter(|v| !v.is_empty()) {
        let with_offset = format!("{normalized} {offset}");
        if let Ok(dt) = DateTime::parse_from_str(&with_offset, "%Y:%m:%d %H:%M:%S %:z") {
            return Some(dt.with_timezone(&Local));
        }
    }

    let candidates = ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y:%m:%d %H:%M:%S%.f"];
    for fmt in candidates {
        if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, fmt) {
            if let Some(local) = Local.from_local_datetime(&naive).earliest() {
                return Some(local);
            }
        }
    }

    None
}
