use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, FormField};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> axum::body::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn form_request(boundary: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri("/multipart")
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(body.to_string())
        .unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_method_path_and_body() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/echo/items/7?x=1")
                .header("x-probe", "yes")
                .body("payload".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.path, "/echo/items/7?x=1");
    assert_eq!(echo.body, "payload");
    assert_eq!(echo.body_length, 7);
    assert!(echo.headers.contains(&("x-probe".to_string(), "yes".to_string())));
}

#[tokio::test]
async fn echo_accepts_empty_get() {
    let resp = app()
        .oneshot(Request::builder().uri("/echo").body(String::new()).unwrap())
        .await
        .unwrap();
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.body_length, 0);
}

// --- multipart ---

#[tokio::test]
async fn multipart_lists_fields_in_order() {
    let body = "--XYZ\r\n\
                Content-Disposition: form-data; name=\"title\"\r\n\r\n\
                hello\r\n\
                --XYZ\r\n\
                Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
                Content-Type: text/plain\r\n\
                Content-Transfer-Encoding: base64\r\n\r\n\
                aGk=\r\n\
                --XYZ--\r\n";
    let resp = app().oneshot(form_request("XYZ", body)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let fields: Vec<FormField> = body_json(resp).await;
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name.as_deref(), Some("title"));
    assert_eq!(fields[0].data, "hello");
    assert_eq!(fields[1].file_name.as_deref(), Some("a.txt"));
    assert_eq!(fields[1].content_type.as_deref(), Some("text/plain"));
    assert_eq!(fields[1].transfer_encoding.as_deref(), Some("base64"));
    assert_eq!(fields[1].data, "aGk=");
}

#[tokio::test]
async fn multipart_without_boundary_is_rejected() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/multipart")
                .header(http::header::CONTENT_TYPE, "text/plain")
                .body("nope".to_string())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

// --- status / chunked ---

#[tokio::test]
async fn status_route_returns_requested_code() {
    let resp = app()
        .oneshot(Request::builder().uri("/status/418").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn chunked_route_streams_all_pieces() {
    let resp = app()
        .oneshot(Request::builder().uri("/chunked").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"first,second,third");
}
