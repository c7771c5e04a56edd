//! HTTP API tests driven through the router without a socket

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::database::{ADMIN_PASSWORD, ADMIN_USERNAME, CRON_SECRET};
use crate::common::{logging, test_app, test_data, TestApp};

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible")
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Log in and return the `name=value` cookie pair.
async fn login(app: &TestApp, username: &str, password: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "username": username, "password": password }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie")
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

#[tokio::test]
async fn test_login_status_and_logout() {
    logging::init_test_logging();
    logging::log_test_step("Testing session lifecycle over HTTP");
    let app = test_app().await.unwrap();

    let bad = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "username": ADMIN_USERNAME, "password": "wrong-password" }),
        ),
    )
    .await;
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);

    let anonymous = body_json(send(&app, get("/api/auth/status", None)).await).await;
    assert_eq!(anonymous["authenticated"], false);

    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let status = body_json(send(&app, get("/api/auth/status", Some(&cookie))).await).await;
    assert_eq!(status["authenticated"], true);
    assert_eq!(status["user"]["username"], ADMIN_USERNAME);
    assert_eq!(status["user"]["role"], "admin");

    let logout = send(&app, json_request("POST", "/api/auth/logout", Some(&cookie), json!({}))).await;
    assert_eq!(logout.status(), StatusCode::OK);
    let after = send(&app, get("/api/pages", Some(&cookie))).await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_session() {
    let app = test_app().await.unwrap();

    for uri in ["/api/pages", "/api/admin/bootstrap", "/api/settings", "/api/backups"] {
        let response = send(&app, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let forged = send(&app, get("/api/pages", Some("clinic_session=forged"))).await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(forged).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_pages_crud_and_public_visibility() {
    let app = test_app().await.unwrap();
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let created = send(
        &app,
        json_request(
            "POST",
            "/api/pages",
            Some(&cookie),
            serde_json::to_value(test_data::page("visiting-hours", false)).unwrap(),
        ),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let page = body_json(created).await;
    let id = page["id"].as_i64().expect("page id");

    let hidden = send(&app, get("/api/public/pages/visiting-hours", None)).await;
    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

    let mut published = page.clone();
    published["published"] = json!(true);
    let updated = send(
        &app,
        json_request("PUT", &format!("/api/pages/{id}"), Some(&cookie), published),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);

    let visible = send(&app, get("/api/public/pages/visiting-hours", None)).await;
    assert_eq!(visible.status(), StatusCode::OK);
    assert_eq!(body_json(visible).await["slug"], "visiting-hours");

    let duplicate = send(
        &app,
        json_request(
            "POST",
            "/api/pages",
            Some(&cookie),
            serde_json::to_value(test_data::page("visiting-hours", true)).unwrap(),
        ),
    )
    .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let invalid = send(
        &app,
        json_request(
            "POST",
            "/api/pages",
            Some(&cookie),
            json!({ "title": "Bad", "slug": "Bad Slug" }),
        ),
    )
    .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_editors_cannot_manage_users() {
    let app = test_app().await.unwrap();
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let created = send(
        &app,
        json_request(
            "POST",
            "/api/users",
            Some(&admin),
            json!({ "username": "reception", "password": "front-desk-1", "role": "editor" }),
        ),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let user = body_json(created).await;
    assert!(user.get("password_hash").is_none());

    let editor = login(&app, "reception", "front-desk-1").await;
    let denied = send(
        &app,
        json_request(
            "POST",
            "/api/users",
            Some(&editor),
            json!({ "username": "intruder", "password": "long-enough" }),
        ),
    )
    .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let promote = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/users/{}", user["id"]),
            Some(&editor),
            json!({ "username": "reception", "role": "admin" }),
        ),
    )
    .await;
    assert_eq!(promote.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_public_menu_is_nested() {
    let app = test_app().await.unwrap();
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let parent = body_json(
        send(
            &app,
            json_request(
                "POST",
                "/api/menu",
                Some(&cookie),
                serde_json::to_value(test_data::menu_item(None, "Services", None, 1)).unwrap(),
            ),
        )
        .await,
    )
    .await;
    let parent_id = parent["item"]["id"].as_i64().expect("parent id");

    for (title, position) in [("Dental", 1), ("Lab", 2)] {
        let response = send(
            &app,
            json_request(
                "POST",
                "/api/menu",
                Some(&cookie),
                serde_json::to_value(test_data::menu_item(None, title, Some(parent_id), position))
                    .unwrap(),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let menu = body_json(send(&app, get("/api/public/menu", None)).await).await;
    assert_eq!(menu.as_array().map(Vec::len), Some(1));
    assert_eq!(menu[0]["title"], "Services");
    assert_eq!(menu[0]["children"][0]["title"], "Dental");
    assert_eq!(menu[0]["children"][1]["title"], "Lab");
}

#[tokio::test]
async fn test_survey_submission_and_csv_export() {
    let app = test_app().await.unwrap();
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let saved = body_json(
        send(
            &app,
            json_request(
                "POST",
                "/api/surveys/tree",
                Some(&cookie),
                serde_json::to_value(test_data::survey_tree("Visit feedback")).unwrap(),
            ),
        )
        .await,
    )
    .await;
    let tree = &saved["tree"];
    let survey_id = tree["id"].as_i64().expect("survey id");
    let booking_id = tree["questions"][0]["id"].as_i64().unwrap();
    let phone_option = tree["questions"][0]["options"][0]["id"].as_i64().unwrap();
    let rating_id = tree["questions"][1]["id"].as_i64().unwrap();

    let submitted = send(
        &app,
        json_request(
            "POST",
            &format!("/api/public/surveys/{survey_id}/responses"),
            None,
            json!({ "answers": [
                { "question_id": booking_id, "option_ids": [phone_option] },
                { "question_id": rating_id, "text": "4" },
            ] }),
        ),
    )
    .await;
    assert_eq!(submitted.status(), StatusCode::CREATED);
    let response_id = body_json(submitted).await["response_id"]
        .as_str()
        .unwrap()
        .to_string();

    let export = send(&app, get(&format!("/api/surveys/{survey_id}/export"), Some(&cookie))).await;
    assert_eq!(export.status(), StatusCode::OK);
    assert_eq!(
        export.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let disposition = export.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains(&format!("survey-{survey_id}-responses.csv")));

    let bytes = to_bytes(export.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("response_id,submitted_at,How did you book?,Rate your visit,Anything else?")
    );
    let row = lines.next().expect("one response row");
    assert!(row.starts_with(&response_id));
    assert!(row.ends_with(",Phone,4,"));
}

#[tokio::test]
async fn test_scheduler_requires_bearer_secret() {
    let app = test_app().await.unwrap();

    let missing = send(&app, get("/api/scheduler?task=backup", None)).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/api/scheduler?task=backup")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, wrong).await.status(), StatusCode::UNAUTHORIZED);

    let authorized = |uri: &str| {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {CRON_SECRET}"))
            .body(Body::empty())
            .unwrap()
    };

    // Backups are disabled by default, so only a forced run does anything.
    let skipped = body_json(send(&app, authorized("/api/scheduler?task=backup")).await).await;
    assert_eq!(skipped["ran"], false);

    let forced = body_json(send(&app, authorized("/api/scheduler?task=backup&force=true")).await).await;
    assert_eq!(forced["ran"], true);
    assert_eq!(forced["backup"]["status"], "completed");

    let unknown = send(&app, authorized("/api/scheduler?task=vacuum")).await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

    let records = app.state.db.list_backups().await.unwrap();
    assert_eq!(records.len(), 1);
}

fn upload_request(cookie: &str, filename: &str, content: &str) -> Request<Body> {
    let boundary = "clinic-upload-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_upload_accepts_images_and_rejects_svg() {
    let app = test_app().await.unwrap();
    let cookie = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let svg = send(
        &app,
        upload_request(&cookie, "logo.svg", "<svg><script>alert(1)</script></svg>"),
    )
    .await;
    assert_eq!(svg.status(), StatusCode::BAD_REQUEST);

    let png = send(&app, upload_request(&cookie, "team.png", "not really a png")).await;
    assert_eq!(png.status(), StatusCode::CREATED);
    let url = body_json(png).await["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

    let served = send(&app, get(&url, None)).await;
    assert_eq!(served.status(), StatusCode::OK);
}
