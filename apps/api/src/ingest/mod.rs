//! Document Ingest: resume and job-description uploads are reduced to text,
//! structured by the generative capability, validated and stored.

use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;
use crate::fusion::FusionEngine;
use crate::ids::RecordId;
use crate::models::job::JobRecord;
use crate::models::resume::ResumeRecord;
use crate::store::RecordStore;

pub mod handlers;

const PDF_MAGIC: &[u8] = b"%PDF";
const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "text"];

/// Upper bound on characters sent for structuring.
const MAX_DOCUMENT_CHARS: usize = 60_000;

pub async fn ingest_resume(
    store: &dyn RecordStore,
    fusion: &FusionEngine,
    candidate_id: &str,
    filename: Option<String>,
    bytes: Bytes,
) -> Result<ResumeRecord, AppError> {
    let candidate_id = RecordId::parse(candidate_id, "candidate_id")?;
    let text = extract_text(filename.as_deref(), bytes).await?;
    let resume = fusion.structure_resume(&text).await?;
    let record = store.insert_resume(&candidate_id, filename, resume).await?;

    info!(
        resume_id = %record.id,
        %candidate_id,
        candidate_name = record.resume.candidate_name(),
        "Resume ingested"
    );
    Ok(record)
}

pub async fn ingest_job(
    store: &dyn RecordStore,
    fusion: &FusionEngine,
    owner_id: &str,
    filename: Option<String>,
    bytes: Bytes,
) -> Result<JobRecord, AppError> {
    let owner_id = RecordId::parse(owner_id, "owner_id")?;
    let text = extract_text(filename.as_deref(), bytes).await?;
    let job = fusion.structure_job(&text).await?;
    let record = store.insert_job(&owner_id, filename, job).await?;

    info!(job_id = %record.id, %owner_id, job_title = %record.job.job_title, "Job description ingested");
    Ok(record)
}

pub async fn get_resume(store: &dyn RecordStore, resume_id: &str) -> Result<ResumeRecord, AppError> {
    let id = RecordId::parse(resume_id, "resume_id")?;
    store
        .get_resume(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}

pub async fn get_job(store: &dyn RecordStore, job_id: &str) -> Result<JobRecord, AppError> {
    let id = RecordId::parse(job_id, "job_id")?;
    store
        .get_job(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// Jobs created by one owner, newest first.
pub async fn list_jobs(
    store: &dyn RecordStore,
    owner_id: &str,
) -> Result<Vec<JobRecord>, AppError> {
    let owner_id = RecordId::parse(owner_id, "owner_id")?;
    store.list_jobs(&owner_id).await
}

/// PDF bytes go through `pdf-extract` on the blocking pool; plain-text uploads
/// are taken as UTF-8.
pub async fn extract_text(filename: Option<&str>, bytes: Bytes) -> Result<String, AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("uploaded document is empty".to_string()));
    }

    let extension = filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());

    let text = if bytes.starts_with(PDF_MAGIC) || extension.as_deref() == Some("pdf") {
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in PDF extraction: {e}")))?
            .map_err(|e| AppError::Validation(format!("could not read PDF: {e}")))?
    } else if extension
        .as_deref()
        .map_or(true, |ext| TEXT_EXTENSIONS.contains(&ext))
    {
        String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::Validation("text document is not valid UTF-8".to_string()))?
    } else {
        return Err(AppError::Validation(format!(
            "unsupported document type '{}'; upload a PDF or plain-text file",
            extension.unwrap_or_default()
        )));
    };

    let text = normalize_whitespace(&text);
    if text.is_empty() {
        return Err(AppError::Validation(
            "document contains no extractable text".to_string(),
        ));
    }
    Ok(truncate_chars(text, MAX_DOCUMENT_CHARS))
}

/// Collapses runs of blank lines and trailing spaces left by PDF extraction.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}
