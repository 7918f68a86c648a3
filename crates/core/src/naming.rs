//! Device-data file naming convention.
//!
//! Sensor exports uploaded to a study follow the pattern
//! `{participantId}-{deviceId}-{startDate}-{endDate}.{ext}`, e.g.
//! `K7N3G6G-AX6123456-20200704-20200721.csv`:
//!
//! - `participantId` = one site marker letter + six id characters
//! - `deviceId` = three-letter device type code + six id characters
//! - dates = `YYYYMMDD`, start must not be after end
//!
//! Files that do not match the pattern are still accepted by the upload
//! endpoint; this module only decides whether device metadata can be
//! derived from the name.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Upload size cap: 8 GiB, matching the storage backend's segment limit.
pub const FILE_SIZE_LIMIT: u64 = 8_589_934_592;

/// Three-letter device type codes and the device each stands for.
pub const DEVICE_TYPES: &[(&str, &str)] = &[
    ("AX6", "Axivity"),
    ("BVN", "Biovotion"),
    ("BTF", "Byteflies"),
    ("MMM", "McRoberts"),
    ("DRM", "Dreem"),
    ("VTP", "VitalPatch"),
    ("BED", "VTT Bed Sensor"),
    ("YSM", "ZKOne"),
    ("MBT", "Mbient"),
    ("IDE", "German Interview Transcripts"),
    ("IEN", "English Interview Transcripts"),
    ("INL", "Dutch Interview Transcripts"),
    ("TEQ", "Technology Experience Questionnaire"),
    ("PSG", "Polysomnography Data"),
    ("PSR", "Polysomnography Raw Data"),
    ("PSM", "Polysomnography Meta Data"),
];

/// Site marker letters prefixing participant ids.
pub const SITE_MARKERS: &[(&str, &str)] = &[
    ("I", "ICL"),
    ("N", "Newcastle"),
    ("K", "Kiel"),
    ("G", "GHI Muenster"),
    ("E", "EMC Rotterdam"),
];

/// Metadata derived from a well-formed device-data file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFileName {
    pub participant_id: String,
    pub device_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Why a file name could not be parsed as a device-data name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("file name does not match participant-device-start-end pattern")]
    Pattern,

    #[error("unknown site marker: {0}")]
    UnknownSite(String),

    #[error("unknown device type code: {0}")]
    UnknownDevice(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("start date {0} is after end date {1}")]
    DateOrder(NaiveDate, NaiveDate),
}

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Z])([A-Z0-9]{6})-([A-Z]{3})([A-Z0-9]{6})-(\d{8})-(\d{8})\.\w+$")
            .expect("device file-name pattern must compile")
    })
}

/// Look up the human-readable device name for a device type code.
pub fn device_name(code: &str) -> Option<&'static str> {
    DEVICE_TYPES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Look up the site name for a participant-id site marker.
pub fn site_name(marker: &str) -> Option<&'static str> {
    SITE_MARKERS
        .iter()
        .find(|(m, _)| *m == marker)
        .map(|(_, name)| *name)
}

/// Parse a device-data file name into its metadata parts.
///
/// Returns [`NamingError::Pattern`] for names that are not device exports
/// at all (callers typically treat that case as "no metadata" rather than
/// a rejection), and a more specific error for names that match the shape
/// but carry an unknown site/device code or a bad date range.
pub fn parse_device_file_name(file_name: &str) -> Result<DeviceFileName, NamingError> {
    let captures = pattern().captures(file_name).ok_or(NamingError::Pattern)?;

    let site = &captures[1];
    if site_name(site).is_none() {
        return Err(NamingError::UnknownSite(site.to_string()));
    }

    let device_code = &captures[3];
    if device_name(device_code).is_none() {
        return Err(NamingError::UnknownDevice(device_code.to_string()));
    }

    let start_date = parse_date(&captures[5])?;
    let end_date = parse_date(&captures[6])?;
    if start_date > end_date {
        return Err(NamingError::DateOrder(start_date, end_date));
    }

    Ok(DeviceFileName {
        participant_id: format!("{}{}", site, &captures[2]),
        device_id: format!("{}{}", device_code, &captures[4]),
        start_date,
        end_date,
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, NamingError> {
    NaiveDate::parse_from_str(raw, "%Y%m%d").map_err(|_| NamingError::InvalidDate(raw.to_string()))
}
