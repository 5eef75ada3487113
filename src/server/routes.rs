// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::ApidError;
use crate::pipeline::Fleet;
use crate::types::{ClusterIdentity, ClusterReport, ConnectionState};
use bytes::Bytes;
use http::{header, Method, Request, Response, StatusCode};
use http_body_util::Full;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

/// Shared state behind every request
pub struct AppState {
    pub fleet: Arc<Fleet>,
    pub app_version: Option<String>,
}

#[derive(Serialize)]
struct Message<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterView<'a> {
    name: &'a str,
    server: &'a str,
    namespaces: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    shard: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_version: Option<&'a str>,
    connection_state: &'a ConnectionState,
}

impl<'a> From<&'a ClusterIdentity> for ClusterView<'a> {
    fn from(cluster: &'a ClusterIdentity) -> Self {
        Self {
            name: &cluster.name,
            server: cluster.server(),
            namespaces: &cluster.namespaces,
            shard: cluster.shard,
            server_version: cluster.server_version.as_deref(),
            connection_state: &cluster.connection_state,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeprecationResults {
    deprecation_results: Vec<ClusterReport>,
}

fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let (status, payload) = match serde_json::to_vec(body) {
        Ok(payload) => (status, payload),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"message":"internal error"}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(payload)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
    response
}

fn message(status: StatusCode, text: &str) -> Response<Full<Bytes>> {
    json(status, &Message { message: text, version: None })
}

fn failure(e: &ApidError) -> Response<Full<Bytes>> {
    if e.is_not_found() {
        message(StatusCode::NOT_FOUND, &e.to_string())
    } else {
        message(StatusCode::BAD_GATEWAY, &e.to_string())
    }
}

/// Dispatch a request to its handler. The body is never read.
pub async fn route<B>(state: &AppState, req: Request<B>) -> Response<Full<Bytes>> {
    let segments: Vec<&str> = req.uri().path().trim_matches('/').split('/').collect();

    let known = matches!(
        segments.as_slice(),
        ["v1", "ping"] | ["v1alpha", "clusters"] | ["v1alpha", "deprecations"] | ["v1alpha", _, "deprecations"]
    );
    if !known {
        return message(StatusCode::NOT_FOUND, "not found");
    }
    if req.method() != Method::GET {
        return message(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    }

    match segments.as_slice() {
        ["v1", "ping"] => json(
            StatusCode::OK,
            &Message {
                message: "pong",
                version: state.app_version.as_deref(),
            },
        ),
        ["v1alpha", "clusters"] => match state.fleet.registry().resolve_all().await {
            Ok(clusters) => {
                let views: Vec<ClusterView> = clusters.iter().map(|c| ClusterView::from(c.as_ref())).collect();
                json(StatusCode::OK, &views)
            }
            Err(e) => failure(&e),
        },
        ["v1alpha", "deprecations"] => match state.fleet.run_all().await {
            Ok(reports) => json(
                StatusCode::OK,
                &DeprecationResults {
                    deprecation_results: reports,
                },
            ),
            Err(e) => failure(&e),
        },
        ["v1alpha", cluster, "deprecations"] => {
            let Ok(cluster) = percent_decode_str(cluster).decode_utf8() else {
                return message(StatusCode::BAD_REQUEST, "invalid cluster name");
            };
            match state.fleet.run_one(&cluster).await {
                Ok(report) => json(StatusCode::OK, &report),
                Err(e) => failure(&e),
            }
        }
        _ => message(StatusCode::NOT_FOUND, "not found"),
    }
}
