//! Date-stamped local copies of a downloadable dataset.
//!
//! Layout: `{dir}/{stem}_{YYYY-MM-DD}.{ext}` with a `{file}.hash` sidecar
//! holding the blake3 digest of the content. A refresh on the same day as the
//! latest copy only replaces it when the downloaded bytes differ; any
//! download failure falls back to the newest existing copy.

use super::provider::DataError;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

type Downloader = Box<dyn Fn() -> Result<Vec<u8>, DataError> + Send + Sync>;

pub struct DatasetStore {
    dir: PathBuf,
    stem: String,
    ext: String,
    download: Downloader,
}

impl DatasetStore {
    /// Store fed by an HTTP GET of `url`. `file_name` gives the stem and
    /// extension of the dated copies (`ie_data.csv` → `ie_data_2025-12-15.csv`).
    pub fn new(dir: impl Into<PathBuf>, file_name: &str, url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;
        let url = url.into();

        Ok(Self::with_downloader(dir, file_name, move || {
            info!(url = %url, "downloading dataset");
            let resp = client
                .get(&url)
                .send()
                .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(DataError::Other(format!("HTTP {status} from {url}")));
            }
            resp.bytes()
                .map(|b| b.to_vec())
                .map_err(|e| DataError::NetworkUnreachable(e.to_string()))
        }))
    }

    pub fn with_downloader<F>(dir: impl Into<PathBuf>, file_name: &str, download: F) -> Self
    where
        F: Fn() -> Result<Vec<u8>, DataError> + Send + Sync + 'static,
    {
        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) => (stem.to_string(), ext.to_string()),
            None => (file_name.to_string(), String::new()),
        };
        Self {
            dir: dir.into(),
            stem,
            ext,
            download: Box::new(download),
        }
    }

    fn dated_path(&self, date: NaiveDate) -> PathBuf {
        let name = if self.ext.is_empty() {
            format!("{}_{date}", self.stem)
        } else {
            format!("{}_{date}.{}", self.stem, self.ext)
        };
        self.dir.join(name)
    }

    fn date_of(&self, path: &Path) -> Option<NaiveDate> {
        let name = path.file_name()?.to_str()?;
        let rest = name.strip_prefix(&self.stem)?.strip_prefix('_')?;
        let stamp = if self.ext.is_empty() {
            rest
        } else {
            rest.strip_suffix(&self.ext)?.strip_suffix('.')?
        };
        NaiveDate::parse_from_str(stamp, "%Y-%m-%d").ok()
    }

    /// Newest dated copy on disk, if any.
    pub fn latest(&self) -> Option<(NaiveDate, PathBuf)> {
        fs::read_dir(&self.dir)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter_map(|path| self.date_of(&path).map(|date| (date, path)))
            .max_by_key(|(date, _)| *date)
    }

    /// Make sure a copy as of `as_of` exists and return its path.
    pub fn refresh(&self, as_of: NaiveDate) -> Result<PathBuf, DataError> {
        let latest = self.latest();

        let bytes = match (self.download)() {
            Ok(bytes) => bytes,
            Err(e) => {
                return match latest {
                    Some((date, path)) => {
                        warn!(error = %e, copy = %date, "dataset download failed, using existing copy");
                        Ok(path)
                    }
                    None => Err(e),
                };
            }
        };
        let digest = blake3::hash(&bytes).to_hex().to_string();

        if let Some((date, path)) = &latest {
            if *date == as_of && stored_hash(path).as_deref() == Some(digest.as_str()) {
                debug!(path = %path.display(), "dataset unchanged");
                return Ok(path.clone());
            }
        }

        let target = self.dated_path(as_of);
        fs::create_dir_all(&self.dir)
            .map_err(|e| DataError::Dataset(format!("create {}: {e}", self.dir.display())))?;
        write_atomic(&target, &bytes)?;
        write_atomic(&hash_path(&target), digest.as_bytes())?;
        info!(path = %target.display(), "dataset updated");
        Ok(target)
    }
}

fn hash_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".hash");
    PathBuf::from(name)
}

/// Sidecar digest, recomputed from the content when the sidecar is missing.
fn stored_hash(path: &Path) -> Option<String> {
    match fs::read_to_string(hash_path(path)) {
        Ok(hash) => Some(hash.trim().to_string()),
        Err(_) => fs::read(path)
            .ok()
            .map(|bytes| blake3::hash(&bytes).to_hex().to_string()),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DataError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(|e| DataError::Dataset(format!("write {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        DataError::Dataset(format!("atomic rename failed: {e}"))
    })
}
