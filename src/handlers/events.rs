use std::collections::HashMap;

use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;

use crate::error::EventError;
use crate::models::{Event, EventDraft, MappingSupport, SupportNeeds};
use crate::services::intake::Submission;
use crate::services::uploads::{self, StagedFile, UploadDirs};
use crate::utils::date::parse_utc;
use crate::AppState;

pub const MAX_MAPPING_FILES: usize = 10;

/// Raw multipart form: text fields plus the files already streamed to the temporary area.
#[derive(Debug, Default)]
pub struct EventForm {
    pub fields: HashMap<String, String>,
    pub flyer: Option<StagedFile>,
    pub mapping_files: Vec<StagedFile>,
}

impl EventForm {
    pub fn staged_files(&self) -> Vec<StagedFile> {
        self.flyer
            .iter()
            .chain(self.mapping_files.iter())
            .cloned()
            .collect()
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str, label: &str) -> Result<String, EventError> {
        self.text(key)
            .map(str::to_string)
            .ok_or_else(|| EventError::validation(format!("{} is required", label)))
    }

    fn flag(&self, key: &str) -> bool {
        self.fields.get(key).map(|v| v.trim() == "true").unwrap_or(false)
    }

    /// Free-text detail for a support flag, `"No"` when the requester left it blank.
    fn detail(&self, key: &str) -> String {
        self.text(key).unwrap_or("No").to_string()
    }

    pub fn into_submission(self) -> Result<Submission, EventError> {
        let scheduled_at = parse_utc(&self.required("date", "Date")?).map_err(EventError::Validation)?;
        let support_needs = SupportNeeds {
            vehicles: self.flag("needsCars").then(|| self.detail("carsDesc")),
            radio: self
                .flag("needsRadio")
                .then(|| self.text("radioDesc").unwrap_or_default().to_string()),
            mapping: self.flag("needsMapping").then(|| MappingSupport {
                detail: self.detail("mappingDesc"),
                images: Vec::new(),
            }),
        };
        let draft = EventDraft {
            requester_id: self.required("userId", "User id")?,
            title: self.required("title", "Title")?,
            description: self.text("description").unwrap_or_default().to_string(),
            scheduled_at,
            flyer_asset: None,
            support_needs,
        };
        Ok(Submission {
            draft,
            flyer: self.flyer,
            mapping_files: self.mapping_files,
        })
    }
}

async fn stage_field(uploads: &UploadDirs, mut field: Field<'_>) -> Result<StagedFile, EventError> {
    let (staged, mut file) = uploads
        .stage(field.file_name())
        .await
        .map_err(EventError::storage)?;
    let written = async {
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| EventError::validation(format!("Upload interrupted: {}", e)))?
        {
            file.write_all(&chunk).await.map_err(EventError::storage)?;
        }
        file.flush().await.map_err(EventError::storage)
    }
    .await;
    match written {
        Ok(()) => Ok(staged),
        Err(e) => {
            uploads::discard(std::slice::from_ref(&staged)).await;
            Err(e)
        }
    }
}

/// Reads every part into `form`. Files beyond the per-field limits are dropped unread.
pub async fn read_form(
    uploads: &UploadDirs,
    multipart: &mut Multipart,
    form: &mut EventForm,
) -> Result<(), EventError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| EventError::validation(format!("Malformed form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "flyer" if field.file_name().is_some() => {
                if form.flyer.is_none() {
                    form.flyer = Some(stage_field(uploads, field).await?);
                }
            }
            "mappingFiles" if field.file_name().is_some() => {
                if form.mapping_files.len() < MAX_MAPPING_FILES {
                    let staged = stage_field(uploads, field).await?;
                    form.mapping_files.push(staged);
                }
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| EventError::validation(format!("Malformed field {}: {}", name, e)))?;
                form.fields.insert(name, value);
            }
        }
    }
    Ok(())
}

fn error_response(e: EventError) -> (StatusCode, Json<Value>) {
    let status = if e.is_user_error() {
        tracing::info!("Submission refused: {}", e);
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!("Submission failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(json!({ "error": e.to_string() })))
}

// Full event collection, for the dashboard and history views
pub async fn get_events(State(state): State<AppState>) -> Json<Vec<Event>> {
    Json(state.store.all().await)
}

// Multipart event request from the web form
pub async fn create_event(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut form = EventForm::default();
    if let Err(e) = read_form(&state.uploads, &mut multipart, &mut form).await {
        uploads::discard(&form.staged_files()).await;
        return Err(error_response(e));
    }

    let staged = form.staged_files();
    let submission = match form.into_submission() {
        Ok(submission) => submission,
        Err(e) => {
            uploads::discard(&staged).await;
            return Err(error_response(e));
        }
    };

    let event = state
        .intake
        .submit(submission, Utc::now())
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "success": true, "id": event.id() })))
}
