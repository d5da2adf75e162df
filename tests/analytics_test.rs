//! Analytics, recommendations and the admin dataset endpoints.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};

mod common;
use common::*;

use event_api::http::HttpServer;

async fn attendee(router: &Router, token: &str, email: &str) -> u64 {
    let body = json!({ "name": "Guest", "email": email });
    let response = send(router, json_request(Method::POST, "/attendees", &body, Some(token))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_u64().unwrap()
}

async fn going(router: &Router, token: &str, event_id: u64, attendee_id: u64) {
    let body = json!({ "attendee_id": attendee_id, "status": "going" });
    let uri = format!("/events/{event_id}/rsvps");
    let response = send(router, json_request(Method::POST, &uri, &body, Some(token))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn event_at(router: &Router, token: &str, title: &str, location: &str, start: &str) -> u64 {
    let body = json!({
        "title": title,
        "location": location,
        "start_time": start,
        "end_time": "2031-01-01T00:00:00Z",
        "capacity": 50,
    });
    let response = send(router, json_request(Method::POST, "/events", &body, Some(token))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_u64().unwrap()
}

#[tokio::test]
async fn trending_ranks_by_rsvp_activity() {
    let router = server().router();
    let token = token_for(&router, "alice").await;
    let single = create_event(&router, &token, "Single", "2030-01-01T10:00:00Z").await;
    let double = create_event(&router, &token, "Double", "2030-01-02T10:00:00Z").await;
    create_event(&router, &token, "Empty", "2030-01-03T10:00:00Z").await;

    let bob = attendee(&router, &token, "bob@example.com").await;
    let eve = attendee(&router, &token, "eve@example.com").await;
    going(&router, &token, single, bob).await;
    going(&router, &token, double, bob).await;
    going(&router, &token, double, eve).await;

    let response = send(&router, get("/analytics/events/trending")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let ranked = body_json(response).await;
    assert_eq!(
        ranked,
        json!([
            { "event_id": double, "title": "Double", "trending_score": 4.0, "recent_rsvps": 2 },
            { "event_id": single, "title": "Single", "trending_score": 2.0, "recent_rsvps": 1 },
        ])
    );

    let top = body_json(send(&router, get("/analytics/events/trending?limit=1")).await).await;
    assert_eq!(top.as_array().unwrap().len(), 1);

    for bad in ["limit=0", "window_days=0", "window_days=400", "limit=abc"] {
        let response = send(&router, get(&format!("/analytics/events/trending?{bad}"))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{bad}");
    }
}

#[tokio::test]
async fn seasonality_counts_events_per_month() {
    let router = server().router();
    let token = token_for(&router, "alice").await;
    create_event(&router, &token, "March", "2030-03-05T10:00:00Z").await;
    create_event(&router, &token, "January", "2030-01-20T10:00:00Z").await;
    create_event(&router, &token, "March again", "2030-03-25T10:00:00Z").await;

    let body = body_json(send(&router, get("/analytics/events/seasonality")).await).await;
    assert_eq!(
        body,
        json!({ "items": [
            { "month": "2030-01", "count": 1 },
            { "month": "2030-03", "count": 2 },
        ]})
    );
}

#[tokio::test]
async fn recommendations_start_cold_and_revalidate() {
    let router = server().router();
    let response = send(&router, get("/events/recommendations")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = token_for(&router, "alice").await;
    create_event(&router, &token, "Past", "2020-01-01T10:00:00Z").await;
    for day in 1..=6 {
        create_event(&router, &token, &format!("Day {day}"), &format!("2030-02-0{day}T10:00:00Z")).await;
    }

    let response = send(&router, authed(Method::GET, "/events/recommendations", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    let etag = response.headers()[header::ETAG].clone();
    let body = body_json(response).await;
    let titles: Vec<&str> = body["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Day 1", "Day 2", "Day 3", "Day 4", "Day 5"]);
    assert_eq!(body["recommendations"][0]["reason"], "Top upcoming event");
    assert_eq!(body["user_id"], 1);

    let revalidate = Request::builder()
        .uri("/events/recommendations")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::IF_NONE_MATCH, etag)
        .body(Body::empty())
        .unwrap();
    let response = send(&router, revalidate).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn recommendations_follow_visited_locations() {
    let router = server().router();
    let token = token_for(&router, "alice").await;
    let past = event_at(&router, &token, "Old meetup", "Lisbon", "2020-05-01T10:00:00Z").await;
    let booked = event_at(&router, &token, "Booked", "Lisbon", "2030-05-01T10:00:00Z").await;
    let fresh = event_at(&router, &token, "Fresh", "Lisbon", "2030-06-01T10:00:00Z").await;
    event_at(&router, &token, "Elsewhere", "Oslo", "2030-04-01T10:00:00Z").await;

    let me = attendee(&router, &token, "alice@example.com").await;
    going(&router, &token, past, me).await;
    going(&router, &token, booked, me).await;

    let body = body_json(send(&router, authed(Method::GET, "/events/recommendations", &token)).await).await;
    assert_eq!(
        body["recommendations"],
        json!([{
            "event_id": fresh,
            "title": "Fresh",
            "score": 0.9,
            "reason": "Based on your interest in Lisbon",
            "location": "Lisbon",
            "start_time": "2030-06-01T10:00:00Z",
        }])
    );
}

fn run_import(token: &str, query: &str) -> Request<Body> {
    authed(Method::POST, &format!("/admin/imports/run{query}"), token)
}

const DATASET: &str = "\
EventId,EventTitle,Description,Venue,StartDate,EndDate,Capacity,Category
L1,Light Night,Art trail,Town Hall,2030-10-10T18:00:00,2030-10-10T23:00:00,500,Arts
L2,Food Fest,,Millennium Square,2030-08-01T11:00:00,2030-08-01T20:00:00,1000,Food
L3,Broken,,Somewhere,not-a-date,2030-08-01T20:00:00,10,Misc
";

#[tokio::test]
async fn admin_routes_require_an_admin() {
    let router = server().router();
    let routes = [
        (Method::POST, "/admin/imports/run"),
        (Method::GET, "/admin/imports"),
        (Method::GET, "/admin/dataset/meta"),
    ];
    for (i, (method, uri)) in routes.into_iter().enumerate() {
        let request = Request::builder().method(method.clone()).uri(uri).body(Body::empty()).unwrap();
        assert_eq!(send(&router, request).await.status(), StatusCode::UNAUTHORIZED, "{uri}");

        let token = token_for(&router, &format!("user{i}")).await;
        let response = send(&router, authed(method, uri, &token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("privileges"), "{detail}");
    }
}

#[tokio::test]
async fn admin_imports_dataset_with_provenance() {
    let dir = scratch_dir();
    std::fs::write(dir.join("events.csv"), DATASET).unwrap();
    let mut config = test_config();
    config.dataset.import_dir = dir.display().to_string();
    let router = HttpServer::new(config).router();
    let token = token_for(&router, ADMIN).await;

    let meta = body_json(send(&router, authed(Method::GET, "/admin/dataset/meta", &token)).await).await;
    assert_eq!(meta, json!({ "message": "No dataset imported yet" }));

    let response = send(&router, run_import(&token, "")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["source"], "events.csv");
    let run = &body["run"];
    assert_eq!(run["status"], "partial_success");
    assert_eq!(run["rows_read"], 3);
    assert_eq!(run["rows_inserted"], 2);
    assert_eq!(run["errors"][0]["row"], 3);
    assert_eq!(run["parser_version"], "v1_csv");
    assert_eq!(run["sha256_hash"].as_str().unwrap().len(), 64);

    let again = body_json(send(&router, run_import(&token, "?source_type=csv&file=events.csv")).await).await;
    assert_eq!(again["run"]["rows_inserted"], 0);
    assert_eq!(again["run"]["rows_updated"], 2);

    let listed = body_json(send(&router, get("/events?limit=100")).await).await;
    assert_eq!(listed["total"], 2);

    let runs: Value = body_json(send(&router, authed(Method::GET, "/admin/imports?limit=10", &token)).await).await;
    let ids: Vec<u64> = runs.as_array().unwrap().iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![2, 1]);

    let meta = body_json(send(&router, authed(Method::GET, "/admin/dataset/meta", &token)).await).await;
    assert_eq!(meta["source_name"], "Local events CSV");
    assert_eq!(meta["rows_inserted"], 0);
    assert_eq!(meta["sha256_hash"], run["sha256_hash"]);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn admin_import_rejects_bad_input_and_hides_io_errors() {
    let dir = scratch_dir();
    let mut config = test_config();
    config.dataset.import_dir = dir.display().to_string();
    let router = HttpServer::new(config).router();
    let token = token_for(&router, ADMIN).await;

    let response = send(&router, run_import(&token, "?source_type=xml")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = send(&router, run_import(&token, "?file=..%2Fsecret.csv")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = send(&router, run_import(&token, "?file=missing.csv")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "Internal Server Error");
    assert!(!body.to_string().contains("missing.csv"));

    let runs = body_json(send(&router, authed(Method::GET, "/admin/imports", &token)).await).await;
    assert_eq!(runs[0]["status"], "failed");

    std::fs::remove_dir_all(&dir).unwrap();
}
