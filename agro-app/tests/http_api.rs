//! End-to-end tests of the HTTP surface against an in-memory SQLite store.
//!
//! Requests are written by hand over a TCP socket so the exact status line,
//! headers and body the server produces are what gets asserted.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use agro_app::app::open_repository;
use agro_app::http::{AppState, build_router};
use agro_core::calculations::{EngineConfig, SurveySection};
use agro_core::db::DbConfig;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn spawn_server() -> SocketAddr {
    let repo = open_repository(&DbConfig::default())
        .await
        .expect("open in-memory repository");
    let app = build_router(AppState::new(repo, EngineConfig::default()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&str>,
) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");

    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (name, value) in headers {
        req.push_str(&format!("{name}: {value}\r\n"));
    }
    match body {
        Some(body) => {
            req.push_str("Content-Type: application/json\r\n");
            req.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
        }
        None => req.push_str("\r\n"),
    }

    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    (status, head.to_string(), body.to_string())
}

async fn get_json(
    addr: SocketAddr,
    path: &str,
) -> (u16, Value) {
    let (status, _, body) = send_raw(addr, "GET", path, &[], None).await;
    (status, serde_json::from_str(&body).expect("json body"))
}

async fn post_json(
    addr: SocketAddr,
    path: &str,
    headers: &[(&str, &str)],
    payload: &Value,
) -> (u16, Value) {
    let text = payload.to_string();
    let (status, _, body) = send_raw(addr, "POST", path, headers, Some(&text)).await;
    (status, serde_json::from_str(&body).expect("json body"))
}

fn reference_simulation() -> Value {
    json!({
        "crop": "TRIGO",
        "area_hectares": 30,
        "level": "LOW",
        "scenario": "REALISTIC",
        "baseline": { "kind": "managed_spend", "amount": 12000000 },
        "investment": { "mode": "manual", "amount": 1500000 },
        "horizon": 24
    })
}

fn uniform_answers(value: u8) -> BTreeMap<String, u8> {
    SurveySection::all()
        .iter()
        .flat_map(|section| {
            (0..section.questions.len()).map(move |i| (section.answer_key(i), value))
        })
        .collect()
}

#[tokio::test]
async fn healthz_answers_ok() {
    let addr = spawn_server().await;

    let (status, head, body) = send_raw(addr, "GET", "/healthz", &[], None).await;

    assert_eq!(status, 200);
    assert_eq!(body, "ok");
    assert!(head.to_ascii_lowercase().contains("access-control-allow-origin: *"));
}

#[tokio::test]
async fn simulation_returns_result_and_summary() {
    let addr = spawn_server().await;

    let (status, body) = post_json(addr, "/v1/simulations", &[], &reference_simulation()).await;

    assert_eq!(status, 200);
    assert_eq!(body["ok"], true);
    assert_eq!(body["result"]["crop"], "TRIGO");
    assert_eq!(body["result"]["crossing_month"], 7);
    assert_eq!(body["result"]["cumulative_cash_flow"].as_array().map(Vec::len), Some(25));
    assert_eq!(body["summary"]["monthly_benefit"], "232408");
    assert_eq!(body["summary"]["payback_label"], "6.5");
    assert_eq!(body["summary"]["horizon_months"], 24);
}

#[tokio::test]
async fn simulation_with_zero_area_and_automatic_investment() {
    let addr = spawn_server().await;
    let mut payload = reference_simulation();
    payload["area_hectares"] = json!(0);
    payload["investment"] = json!({ "mode": "automatic" });

    let (status, body) = post_json(addr, "/v1/simulations", &[], &payload).await;

    assert_eq!(status, 200);
    assert_eq!(body["result"]["scaling_factor"], "1");
    assert_eq!(body["summary"]["investment"], "1500000");
}

#[tokio::test]
async fn simulation_rejects_malformed_json() {
    let addr = spawn_server().await;

    let (status, _, body) =
        send_raw(addr, "POST", "/v1/simulations", &[], Some("{\"crop\": ")).await;
    let body: Value = serde_json::from_str(&body).expect("json body");

    assert_eq!(status, 400);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap_or_default().starts_with("invalid JSON body"));
}

#[tokio::test]
async fn simulation_rejects_negative_inputs() {
    let addr = spawn_server().await;

    let mut negative_area = reference_simulation();
    negative_area["area_hectares"] = json!(-3);
    let (status, body) = post_json(addr, "/v1/simulations", &[], &negative_area).await;
    assert_eq!(status, 400);
    assert_eq!(body["ok"], false);

    let mut negative_spend = reference_simulation();
    negative_spend["baseline"] = json!({ "kind": "managed_spend", "amount": -1 });
    let (status, _) = post_json(addr, "/v1/simulations", &[], &negative_spend).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn simulation_rejects_values_above_bounds() {
    let addr = spawn_server().await;

    let mut huge_area = reference_simulation();
    huge_area["area_hectares"] = json!("100000000000000");
    huge_area["baseline"] = json!({ "kind": "cost_per_hectare", "amount": "1000000000000000" });
    let (status, body) = post_json(addr, "/v1/simulations", &[], &huge_area).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "area_hectares must not exceed 1000000000");

    let mut huge_spend = reference_simulation();
    huge_spend["baseline"] =
        json!({ "kind": "managed_spend", "amount": "10000000000000000000000000000" });
    let (status, body) = post_json(addr, "/v1/simulations", &[], &huge_spend).await;
    assert_eq!(status, 400);
    assert_eq!(body["ok"], false);

    let (status, _, _) = send_raw(addr, "GET", "/healthz", &[], None).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn simulation_at_bounds_answers() {
    let addr = spawn_server().await;

    let mut at_bounds = reference_simulation();
    at_bounds["area_hectares"] = json!("1000000000");
    at_bounds["baseline"] = json!({ "kind": "cost_per_hectare", "amount": "1000000000000000000" });
    let (status, body) = post_json(addr, "/v1/simulations", &[], &at_bounds).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"]["annual_baseline_spend"], "1000000000000000000");

    let mut tiny_investment = reference_simulation();
    tiny_investment["investment"] =
        json!({ "mode": "manual", "amount": "0.0000000000000000000000000001" });
    let (status, body) = post_json(addr, "/v1/simulations", &[], &tiny_investment).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "ROI is outside the representable range");
}

#[tokio::test]
async fn simulation_rejects_unknown_crop_plan_and_missing_reference() {
    let addr = spawn_server().await;

    let mut crop = reference_simulation();
    crop["crop"] = json!("ARROZ");
    let (status, body) = post_json(addr, "/v1/simulations", &[], &crop).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "unknown crop 'ARROZ'");

    let mut plan = reference_simulation();
    plan["investment"] = json!({ "mode": "plan", "plan_id": "semilla" });
    let (status, body) = post_json(addr, "/v1/simulations", &[], &plan).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "unknown plan 'semilla'");

    let mut reference = reference_simulation();
    reference["baseline"] = json!({ "kind": "reference_cost" });
    let (status, body) = post_json(addr, "/v1/simulations", &[], &reference).await;
    assert_eq!(status, 400);
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .starts_with("reference data unavailable"));
}

#[tokio::test]
async fn reference_data_endpoints_list_seeded_rows() {
    let addr = spawn_server().await;

    let (status, crops) = get_json(addr, "/v1/crops").await;
    assert_eq!(status, 200);
    let codes: Vec<&str> = crops["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|c| c["code"].as_str())
        .collect();
    assert_eq!(codes, vec!["TRIGO", "MAIZ", "AVENA", "CEBADA", "RAPS"]);

    let (status, plans) = get_json(addr, "/v1/plans").await;
    assert_eq!(status, 200);
    assert_eq!(plans["items"][0]["id"], "raiz");
    assert_eq!(plans["items"][1]["fixed_amount"], "2400000");
}

#[tokio::test]
async fn diagnostic_is_scored_stored_and_listed() {
    let addr = spawn_server().await;
    let submission = json!({
        "name": "María Pérez",
        "phone": "+56 9 1234 5678",
        "region": "Los Ríos",
        "sector": "Lechería",
        "answers": uniform_answers(3),
    });

    let (status, saved) = post_json(
        addr,
        "/v1/diagnostics",
        &[("User-Agent", "field-tablet"), ("X-Forwarded-For", "10.1.2.3")],
        &submission,
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(saved["ok"], true);
    let key = saved["key"].as_str().expect("key");
    assert!(key.starts_with("diagnostico/"));
    assert!(key.ends_with("_12345678"));
    assert_eq!(saved["result"]["pct"], 60);
    assert_eq!(saved["result"]["level"], "basico");
    assert_eq!(saved["result"]["recommended_plan"], "cosecha");

    let (status, listed) = get_json(addr, "/v1/diagnostics?limit=5").await;
    assert_eq!(status, 200);
    let items = listed["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["key"], key);
    assert_eq!(items[0]["user_agent"], "field-tablet");
    assert_eq!(items[0]["client_ip"], "10.1.2.3");
    assert_eq!(items[0]["source"], "diagnostico-digital-bdata");
}

#[tokio::test]
async fn diagnostic_rejects_bad_contact_and_incomplete_answers() {
    let addr = spawn_server().await;

    let bad_phone = json!({
        "name": "Juan",
        "phone": "22 123 4567",
        "answers": uniform_answers(4),
    });
    let (status, body) = post_json(addr, "/v1/diagnostics", &[], &bad_phone).await;
    assert_eq!(status, 400);
    assert_eq!(body["ok"], false);

    let mut answers = uniform_answers(4);
    answers.remove("datos-5");
    let incomplete = json!({
        "name": "Juan",
        "phone": "912345678",
        "answers": answers,
    });
    let (status, _) = post_json(addr, "/v1/diagnostics", &[], &incomplete).await;
    assert_eq!(status, 400);

    let (_, listed) = get_json(addr, "/v1/diagnostics").await;
    assert_eq!(listed["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn unsupported_methods_are_rejected() {
    let addr = spawn_server().await;

    let (status, _, _) = send_raw(addr, "DELETE", "/v1/plans", &[], None).await;
    assert_eq!(status, 405);

    let (status, head, _) = send_raw(addr, "OPTIONS", "/v1/simulations", &[], None).await;
    assert_eq!(status, 204);
    assert!(head
        .to_ascii_lowercase()
        .contains("access-control-allow-methods: get, post, options"));
}
