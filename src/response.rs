// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Demo Wallet

//! Success response envelope.
//!
//! Every successful response is `{status: "success", message, data}`;
//! errors render the matching shape in [`crate::error`].

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// The standard success envelope.
#[derive(Debug, Serialize)]
pub struct SuccessEnvelope<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
}

/// Build a `200 OK` success envelope.
pub fn success<T: Serialize>(message: impl Into<String>, data: T) -> impl IntoResponse {
    Json(SuccessEnvelope {
        status: "success",
        message: message.into(),
        data,
    })
}

/// Build a `201 Created` success envelope.
pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(SuccessEnvelope {
            status: "success",
            message: message.into(),
            data,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, response::IntoResponse};

    #[tokio::test]
    async fn success_envelope_shape() {
        let response = success("Done", serde_json::json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Done");
        assert_eq!(body["data"]["id"], 1);
    }

    #[tokio::test]
    async fn created_sets_201() {
        let response = created("Account created successfully", ()).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
