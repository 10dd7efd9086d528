use axum::extract::{Path, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::model::app_state::AppState;
use crate::model::download::FileListResponse;
use crate::model::errors::ServerError;
use crate::shared::constants::{AUDIO_CONTENT_TYPE, FILE_NOT_FOUND_MESSAGE};

pub async fn list_files(State(state): State<AppState>) -> Response {
    match state.file_store.enumerate().await {
        Ok(files) => (StatusCode::OK, Json(FileListResponse { files })).into_response(),
        Err(e) => {
            let error_message = format!("Failed to read download directory: {}", e);
            tracing::error!("{}", &error_message);
            ServerError::with_message(error_message)
                .into_api_error(StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
    }
}

pub async fn play_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Response {
    let Some(path) = state.file_store.resolve(&filename).await else {
        return not_found();
    };

    // ServeFile takes care of Range requests and HEAD.
    let mut response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(e) => match e {},
    };

    if response.status() == StatusCode::NOT_FOUND {
        return not_found();
    }

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(AUDIO_CONTENT_TYPE));
    match HeaderValue::from_str(&content_disposition(&filename)) {
        Ok(value) => {
            headers.insert(CONTENT_DISPOSITION, value);
        }
        Err(e) => tracing::warn!("Failed to build Content-Disposition for {}: {}", &filename, e),
    }

    response
}

fn not_found() -> Response {
    ServerError::with_message(FILE_NOT_FOUND_MESSAGE)
        .into_api_error(StatusCode::NOT_FOUND)
        .into_response()
}

// ASCII fallback plus the RFC 5987 UTF-8 form.
fn content_disposition(filename: &str) -> String {
    let fallback = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect::<String>();

    let encoded = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect::<String>();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_names_are_kept_verbatim() {
        assert_eq!(
            content_disposition("SomeTitle.mp3"),
            "attachment; filename=\"SomeTitle.mp3\"; filename*=UTF-8''SomeTitle.mp3"
        );
    }

    #[test]
    fn non_ascii_names_are_percent_encoded() {
        assert_eq!(
            content_disposition("Canción \"1\".mp3"),
            "attachment; filename=\"Canci_n _1_.mp3\"; filename*=UTF-8''Canci%C3%B3n%20%221%22.mp3"
        );
    }
}
