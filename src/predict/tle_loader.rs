use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::predict::error::PredictError;
use crate::predict::propagation::OrbitalElements;
use crate::predict::types::SatelliteInfo;

const TLE_LINE_LENGTH: usize = 69;

pub struct TleEntry {
    pub info: SatelliteInfo,
    pub elements: OrbitalElements,
}

/// Orbital elements keyed by NORAD id, loaded once and shared by reference.
pub struct TleCatalog {
    tle_dir: Option<PathBuf>,
    satellites: BTreeMap<u32, Arc<TleEntry>>,
}

impl TleCatalog {
    pub fn new(tle_dir: Option<PathBuf>) -> Self {
        Self {
            tle_dir,
            satellites: BTreeMap::new(),
        }
    }

    /// Load all TLE files from the directory
    pub fn load_all(&mut self) -> Result<usize, PredictError> {
        let Some(tle_dir) = self.tle_dir.clone() else {
            return Ok(0);
        };
        if !tle_dir.exists() {
            return Err(PredictError::DirectoryNotFound(
                tle_dir.display().to_string(),
            ));
        }

        self.satellites.clear();

        for entry in fs::read_dir(&tle_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let is_tle = path
                .extension()
                .map(|ext| ext == "tle" || ext == "txt")
                .unwrap_or(false);
            if !is_tle {
                continue;
            }

            match self.load_file(&path) {
                Ok(count) => log::debug!("Loaded {} element sets from {}", count, path.display()),
                Err(e) => {
                    log::warn!("Failed to parse TLE file {}: {}", path.display(), e);
                    // Continue with other files
                }
            }
        }

        log::info!(
            "Loaded {} satellites from {}",
            self.satellites.len(),
            tle_dir.display()
        );
        Ok(self.satellites.len())
    }

    /// Parse a single TLE file (may contain multiple satellites)
    pub fn load_file(&mut self, path: &Path) -> Result<usize, PredictError> {
        let content = fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        self.insert_text(&content, &filename)
    }

    /// Adds every element set found in `content`. Nothing is inserted if any
    /// entry is malformed.
    pub fn insert_text(&mut self, content: &str, source: &str) -> Result<usize, PredictError> {
        let parsed = parse_tle_text(content)
            .into_iter()
            .map(|(name, line1, line2)| -> Result<TleEntry, PredictError> {
                let elements = OrbitalElements::from_lines(name, &line1, &line2).map_err(|e| {
                    PredictError::MalformedElements(format!("{}: {}", source, e))
                })?;
                let name = elements
                    .name()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| format!("NORAD {}", elements.norad_id()));
                Ok(TleEntry {
                    info: SatelliteInfo {
                        name,
                        norad_id: elements.norad_id(),
                        tle_source: source.to_string(),
                        epoch: elements.epoch(),
                    },
                    elements,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let count = parsed.len();
        for entry in parsed {
            self.satellites.insert(entry.info.norad_id, Arc::new(entry));
        }
        Ok(count)
    }

    pub fn tle_dir(&self) -> Option<&Path> {
        self.tle_dir.as_deref()
    }

    pub(crate) fn insert_entry(&mut self, entry: Arc<TleEntry>) {
        self.satellites.insert(entry.info.norad_id, entry);
    }

    pub fn get(&self, norad_id: u32) -> Option<Arc<TleEntry>> {
        self.satellites.get(&norad_id).cloned()
    }

    /// All loaded satellites, ordered by NORAD id
    pub fn satellites(&self) -> Vec<Arc<TleEntry>> {
        self.satellites.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }
}

/// Parse multi-satellite TLE content into `(name, line1, line2)` triples
pub fn parse_tle_text(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            // 2-line TLE (no name)
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            // 3-line TLE (with name)
            let name = lines[i].trim().trim_start_matches("0 ").to_string();
            result.push((
                Some(name),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
            i += 3;
        } else {
            i += 1;
        }
    }

    result
}

/// Checks the fixed-width layout and the modulo-10 checksum of one TLE line.
pub fn check_tle_line(line: &str, line_number: u8) -> Result<&str, PredictError> {
    let line = line.trim_end();
    let malformed = |msg: String| PredictError::MalformedElements(format!("line {}: {}", line_number, msg));

    if !line.is_ascii() {
        return Err(malformed("contains non-ASCII characters".into()));
    }
    if line.len() != TLE_LINE_LENGTH {
        return Err(malformed(format!(
            "expected {} characters, got {}",
            TLE_LINE_LENGTH,
            line.len()
        )));
    }
    if !line.starts_with(&format!("{} ", line_number)) {
        return Err(malformed(format!("must start with '{} '", line_number)));
    }

    let expected = tle_checksum(&line[..TLE_LINE_LENGTH - 1]);
    let found = line.as_bytes()[TLE_LINE_LENGTH - 1];
    if !found.is_ascii_digit() || found - b'0' != expected {
        return Err(malformed(format!(
            "checksum mismatch (expected {}, found '{}')",
            expected, found as char
        )));
    }

    Ok(line)
}

fn tle_checksum(body: &str) -> u8 {
    let sum: u32 = body
        .bytes()
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}
