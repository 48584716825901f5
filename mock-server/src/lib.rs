use axum::{
    body::{Body, Bytes},
    extract::{Multipart, Path},
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::{any, get, post},
    Json, Router,
};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What `/echo` saw of a request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body_length: usize,
    pub body: String,
}

/// One field of a form posted to `/multipart`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormField {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transfer_encoding: Option<String>,
    pub data: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/multipart", post(multipart))
        .route("/status/{code}", get(status))
        .route("/chunked", get(chunked))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    debug!("echo {method} {uri} ({} bytes)", body.len());
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        path: uri.path_and_query().map(|p| p.to_string()).unwrap_or_default(),
        headers,
        body_length: body.len(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn multipart(mut form: Multipart) -> Result<Json<Vec<FormField>>, (StatusCode, String)> {
    let bad_request = |e: axum::extract::multipart::MultipartError| (StatusCode::BAD_REQUEST, e.to_string());
    let mut fields = Vec::new();
    while let Some(field) = form.next_field().await.map_err(bad_request)? {
        let name = field.name().map(str::to_owned);
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let transfer_encoding = field
            .headers()
            .get("content-transfer-encoding")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let data = field.bytes().await.map_err(bad_request)?;
        fields.push(FormField {
            name,
            file_name,
            content_type,
            transfer_encoding,
            data: String::from_utf8_lossy(&data).into_owned(),
        });
    }
    debug!("multipart form with {} fields", fields.len());
    Ok(Json(fields))
}

async fn status(Path(code): Path<u16>) -> Result<StatusCode, StatusCode> {
    StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)
}

async fn chunked() -> Body {
    let pieces = ["first,", "second,", "third"]
        .into_iter()
        .map(|piece| Ok::<_, std::io::Error>(Bytes::from_static(piece.as_bytes())));
    Body::from_stream(futures::stream::iter(pieces))
}
