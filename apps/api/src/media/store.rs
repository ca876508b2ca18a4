//! Interview recordings on local durable storage.
//!
//! Layout: `{root}/{candidate_id}/interview_{application_id}_{timestamp}.{container}`.
//! Uploads stream into a `.partial` file that listing ignores and are published
//! under their final name only once complete. Published files are never
//! overwritten; the newest matching file is "the current recording".

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, Take};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ids::RecordId;
use crate::media::range::resolve_range;

pub const ALLOWED_CONTAINERS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "webm"];
pub const DEFAULT_CONTAINER: &str = "webm";
const FILE_PREFIX: &str = "interview_";
const PARTIAL_EXTENSION: &str = "partial";
const MAX_NAME_ATTEMPTS: u32 = 1000;
/// `YYYYmmdd_HHMMSS`
const TIMESTAMP_LEN: usize = 15;

#[derive(Debug, Clone, Serialize)]
pub struct MediaArtifact {
    pub application_id: String,
    pub filename: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

impl MediaArtifact {
    pub fn container(&self) -> &str {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or(DEFAULT_CONTAINER)
    }
}

/// An opened recording, positioned at the start of the requested span.
/// The reader owns the file handle; dropping it releases the file.
pub struct MediaFetch {
    pub artifact: MediaArtifact,
    pub total_size: u64,
    pub span: Option<(u64, u64)>,
    pub reader: Take<File>,
}

impl MediaFetch {
    pub fn content_length(&self) -> u64 {
        match self.span {
            Some((start, end)) => end - start + 1,
            None => self.total_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    max_bytes: u64,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Streams `body` into a new recording. An empty, oversized or interrupted
    /// upload leaves nothing behind, and no upload is visible until it is complete.
    pub async fn save<S, E>(
        &self,
        application_id: &RecordId,
        candidate_id: &RecordId,
        body: S,
        container: &str,
    ) -> Result<MediaArtifact, AppError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let container = normalize_container(Some(container))?;
        let dir = self.partition(candidate_id);
        fs::create_dir_all(&dir).await?;

        let (mut file, partial) = create_partial_file(&dir, application_id).await?;

        let stored = async {
            let size_bytes = write_body(&mut file, body, self.max_bytes).await?;
            if size_bytes == 0 {
                return Err(AppError::Validation("uploaded video is empty".to_string()));
            }
            file.sync_all().await?;
            let (path, filename) = publish(&dir, &partial, application_id, container).await?;
            Ok::<_, AppError>((size_bytes, path, filename))
        }
        .await;
        drop(file);

        let (size_bytes, path, filename) = match stored {
            Ok(stored) => stored,
            Err(e) => {
                match fs::remove_file(&partial).await {
                    Ok(()) => {}
                    Err(remove_err) if remove_err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(remove_err) => warn!(
                        path = %partial.display(),
                        error = %remove_err,
                        "Could not remove partial upload"
                    ),
                }
                return Err(e);
            }
        };

        let modified = file_modified(&fs::metadata(&path).await?);
        info!(
            %application_id,
            %candidate_id,
            filename = %filename,
            size_bytes,
            "Interview recording stored"
        );
        Ok(MediaArtifact {
            application_id: application_id.to_string(),
            filename,
            path,
            size_bytes,
            modified,
        })
    }

    /// Recordings for a candidate, newest first (mtime, then name timestamp and
    /// collision suffix).
    /// An unknown candidate has no recordings.
    pub async fn list(&self, candidate_id: &RecordId) -> Result<Vec<MediaArtifact>, AppError> {
        let dir = self.partition(candidate_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut artifacts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name().to_string_lossy().into_owned();
            let Some(application_id) = application_id_of(&filename) else {
                continue;
            };
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            artifacts.push(MediaArtifact {
                application_id,
                filename,
                path: entry.path(),
                size_bytes: metadata.len(),
                modified: file_modified(&metadata),
            });
        }

        artifacts.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| name_order(&b.filename).cmp(&name_order(&a.filename)))
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(artifacts)
    }

    /// Opens the newest recording for the application, honouring `range`.
    pub async fn fetch(
        &self,
        application_id: &RecordId,
        candidate_id: &RecordId,
        range: Option<&str>,
    ) -> Result<MediaFetch, AppError> {
        let artifact = self
            .matching(application_id, candidate_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| no_recording(application_id, candidate_id))?;

        let mut file = File::open(&artifact.path).await?;
        let total_size = file.metadata().await?.len();
        let span = resolve_range(range, total_size);

        let reader = match span {
            Some((start, end)) => {
                file.seek(SeekFrom::Start(start)).await?;
                file.take(end - start + 1)
            }
            None => file.take(total_size),
        };

        Ok(MediaFetch {
            artifact,
            total_size,
            span,
            reader,
        })
    }

    /// Removes every recording for the application. Returns the removed filenames.
    pub async fn delete(
        &self,
        application_id: &RecordId,
        candidate_id: &RecordId,
    ) -> Result<Vec<String>, AppError> {
        let matching = self.matching(application_id, candidate_id).await?;
        if matching.is_empty() {
            return Err(no_recording(application_id, candidate_id));
        }

        let mut deleted = Vec::with_capacity(matching.len());
        for artifact in matching {
            fs::remove_file(&artifact.path).await?;
            deleted.push(artifact.filename);
        }
        info!(%application_id, %candidate_id, count = deleted.len(), "Interview recordings deleted");
        Ok(deleted)
    }

    async fn matching(
        &self,
        application_id: &RecordId,
        candidate_id: &RecordId,
    ) -> Result<Vec<MediaArtifact>, AppError> {
        Ok(self
            .list(candidate_id)
            .await?
            .into_iter()
            .filter(|a| a.application_id == application_id.as_str())
            .collect())
    }

    fn partition(&self, candidate_id: &RecordId) -> PathBuf {
        self.root.join(candidate_id.as_str())
    }
}

/// Maps an uploaded filename's extension to an accepted container.
pub fn container_for_filename(filename: Option<&str>) -> Result<&'static str, AppError> {
    let ext = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str());
    normalize_container(ext)
}

pub fn content_type_for(container: &str) -> &'static str {
    match container {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        _ => "video/webm",
    }
}

fn normalize_container(ext: Option<&str>) -> Result<&'static str, AppError> {
    let Some(ext) = ext.map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase()) else {
        return Ok(DEFAULT_CONTAINER);
    };
    ALLOWED_CONTAINERS
        .iter()
        .copied()
        .find(|allowed| *allowed == ext)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "unsupported video container '{ext}'; expected one of {}",
                ALLOWED_CONTAINERS.join(", ")
            ))
        })
}

/// `interview_{application_id}_{timestamp}.{ext}` → application_id.
fn application_id_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if !ALLOWED_CONTAINERS.contains(&ext) {
        return None;
    }
    let rest = stem.strip_prefix(FILE_PREFIX)?;
    let (application_id, _) = rest.split_once('_')?;
    RecordId::parse(application_id, "application_id")
        .ok()
        .map(|id| id.to_string())
}

/// `(timestamp, collision suffix)` of a recording name, so `_10` sorts after `_9`.
fn name_order(filename: &str) -> (&str, u32) {
    let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
    let Some((_, rest)) = stem
        .strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.split_once('_'))
    else {
        return ("", 0);
    };
    match rest.get(TIMESTAMP_LEN..).and_then(|tail| tail.strip_prefix('_')) {
        Some(suffix) => (&rest[..TIMESTAMP_LEN], suffix.parse().unwrap_or(0)),
        None => (rest, 0),
    }
}

async fn create_partial_file(
    dir: &Path,
    application_id: &RecordId,
) -> Result<(File, PathBuf), AppError> {
    let path = dir.join(format!(
        "{FILE_PREFIX}{application_id}_{}.{PARTIAL_EXTENSION}",
        Uuid::new_v4().simple()
    ));
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;
    Ok((file, path))
}

/// Links the finished upload under the first free final name, then drops the
/// partial name. `hard_link` fails on an existing target, so nothing is overwritten.
async fn publish(
    dir: &Path,
    partial: &Path,
    application_id: &RecordId,
    container: &str,
) -> Result<(PathBuf, String), AppError> {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let filename = if attempt == 0 {
            format!("{FILE_PREFIX}{application_id}_{timestamp}.{container}")
        } else {
            format!("{FILE_PREFIX}{application_id}_{timestamp}_{attempt}.{container}")
        };
        let path = dir.join(&filename);
        match fs::hard_link(partial, &path).await {
            Ok(()) => {
                fs::remove_file(partial).await?;
                return Ok((path, filename));
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "no free recording name for application {application_id} at {timestamp}"
    )))
}

async fn write_body<S, E>(file: &mut File, body: S, max_bytes: u64) -> Result<u64, AppError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    futures::pin_mut!(body);
    let mut written: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk =
            chunk.map_err(|e| AppError::Validation(format!("video upload interrupted: {e}")))?;
        written += chunk.len() as u64;
        if written > max_bytes {
            return Err(AppError::Validation(format!(
                "video exceeds the {} MB upload limit",
                max_bytes / (1024 * 1024)
            )));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(written)
}

fn file_modified(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

fn no_recording(application_id: &RecordId, candidate_id: &RecordId) -> AppError {
    AppError::NotFound(format!(
        "No interview recording for application {application_id} and candidate {candidate_id}"
    ))
}
