use crate::error::{EmbeddedDateError, ExtractError};
use crate::exif_reader::{read_embedded_date, sniff_image_kind, ImageKind, SNIFF_LEN};
use crate::metadata::{DateSource, ImageDescriptor};
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;
use tracing::debug;

/// What a backend found inside one file.
#[derive(Debug, Clone)]
pub struct Probe {
    pub kind: ImageKind,
    pub embedded: Result<DateTime<Local>, EmbeddedDateError>,
}

/// Source of capture dates. The pipeline only talks to this trait, so naming
/// and renaming can be exercised with fake clocks instead of real images.
pub trait MetadataProbe: Send + Sync {
    /// Classifies the file by content and tries to read its embedded date.
    /// Unrecognized content is reported as `ExtractError::UnknownType`.
    fn probe(&self, path: &Path) -> Result<Probe, ExtractError>;

    fn fallback_time(&self, path: &Path) -> io::Result<(DateTime<Local>, DateSource)>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub source: DateSource,
    /// Why the embedded date was not used, when it was not.
    pub fallback: Option<String>,
}

/// Fills `date` and `date_source` on the descriptor, or marks it unprocessable.
pub fn extract_date(
    desc: &mut ImageDescriptor,
    probe: &dyn MetadataProbe,
) -> Result<Extraction, ExtractError> {
    let path = desc.original_path().to_path_buf();
    let found = match probe.probe(&path) {
        Ok(found) => found,
        Err(err) => {
            desc.processable = false;
            return Err(err);
        }
    };
    debug!(path = %path.display(), kind = ?found.kind, "probed image");

    let (date, source, fallback) = match found.embedded {
        Ok(date) => (date, DateSource::Embedded, None),
        Err(embedded_err) => match probe.fallback_time(&path) {
            Ok((date, source)) => {
                debug!(path = %path.display(), ?source, "using filesystem timestamp");
                let kind = match source {
                    DateSource::FileCreated => "creation",
                    _ => "change",
                };
                (date, source, Some(format!("{embedded_err}; using file {kind} time")))
            }
            Err(source) => {
                desc.processable = false;
                return Err(ExtractError::Timestamps { path, source });
            }
        },
    };

    desc.date = Some(date);
    desc.date_source = Some(source);
    Ok(Extraction { source, fallback })
}

/// Reads EXIF through `kamadak-exif` and timestamps through `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifProbe;

impl MetadataProbe for ExifProbe {
    fn probe(&self, path: &Path) -> Result<Probe, ExtractError> {
        let open_err = |source| ExtractError::Open {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(open_err)?;

        let mut header = Vec::with_capacity(SNIFF_LEN);
        (&mut file)
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut header)
            .map_err(open_err)?;
        let kind =
            sniff_image_kind(&header).ok_or_else(|| ExtractError::UnknownType(path.to_path_buf()))?;

        file.rewind().map_err(open_err)?;
        let embedded = read_embedded_date(&mut BufReader::new(file));
        Ok(Probe { kind, embedded })
    }

    fn fallback_time(&self, path: &Path) -> io::Result<(DateTime<Local>, DateSource)> {
        let meta = fs::metadata(path)?;
        if let Ok(created) = meta.created() {
            return Ok((DateTime::from(created), DateSource::FileCreated));
        }
        Ok((changed_time(&meta)?, DateSource::FileChanged))
    }
}

#[cfg(unix)]
fn changed_time(meta: &fs::Metadata) -> io::Result<DateTime<Local>> {
    use chrono::TimeZone;
    use std::os::unix::fs::MetadataExt;

    Local
        .timestamp_opt(meta.ctime(), meta.ctime_nsec() as u32)
        .earliest()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "ctime out of range"))
}

#[cfg(not(unix))]
fn changed_time(meta: &fs::Metadata) -> io::Result<DateTime<Local>> {
    meta.modified().map(DateTime::from)
}
