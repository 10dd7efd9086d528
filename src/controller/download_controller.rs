use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::model::app_state::AppState;
use crate::model::download::{DownloadRequest, DownloadResponse};
use crate::model::errors::ServerError;
use crate::shared::constants::DOWNLOAD_STARTED_MESSAGE;

pub async fn submit_download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    let DownloadRequest { url } = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return ServerError::with_message(rejection.body_text())
                .into_api_error(rejection.status())
                .into_response();
        }
    };

    if url.is_empty() {
        return ServerError::with_message("The url cannot be empty.")
            .into_api_error(StatusCode::BAD_REQUEST)
            .into_response();
    }

    match state.download_queue.submit(url.clone()) {
        Ok(id) => {
            tracing::debug!("Queued download {} for {}", id, &url);
            (
                StatusCode::OK,
                Json(DownloadResponse {
                    message: format!("{}{}", DOWNLOAD_STARTED_MESSAGE, url),
                }),
            )
                .into_response()
        }
        Err(e) => {
            let error_message = e.to_string();
            tracing::error!("Failed to schedule download for {}: {}", &url, &error_message);
            ServerError::with_message(error_message)
                .into_api_error(StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
    }
}
