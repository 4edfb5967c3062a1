mod common;

use axum::http::{Method, StatusCode};
use axum::body::Body;
use axum::http::{header, Request};
use cinea_api::state::RequestPolicy;
use common::TestApp;
use serde_json::json;

const PDF: &[u8] = b"%PDF-1.4 crew agreement";
const DOCX: &[u8] = b"PK\x03\x04 word document";

#[tokio::test]
async fn contract_create_checks_the_project() {
    let app = TestApp::new();
    let owner = app.signup("producer@example.com").await;
    let other = app.signup("other@example.com").await;
    let project = app.create_project(&owner.token, "Feature").await;

    let res = app.get("/contract/create", &owner.token).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Please provide projectId");

    let res = app.get(&format!("/contract/create?projectId={}", project), &other.token).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Project does not exist");

    let res = app.get(&format!("/contract/create?projectId={}", project), &owner.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "contract created successfully");
    assert_eq!(res.data()["name"], "Untitled contract");
    assert_eq!(res.data()["documentStatus"], "draft");
    assert_eq!(res.data()["projectId"], project.as_str());
}

#[tokio::test]
async fn contracts_list_paginates_and_filters_by_project() {
    let app = TestApp::new();
    let owner = app.signup("producer@example.com").await;
    let first = app.create_project(&owner.token, "First").await;
    let second = app.create_project(&owner.token, "Second").await;

    for _ in 0..3 {
        app.create_contract(&owner.token, &first).await;
    }
    app.create_contract(&owner.token, &second).await;

    let res = app.get("/contract/all?page=1&limit=2", &owner.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Contracts listed");
    assert_eq!(res.data()["total"], 4);
    assert_eq!(res.data()["items"].as_array().unwrap().len(), 2);
    assert!(res.data()["items"][0]["signers"].is_array());

    let res = app.post(&format!("/contract/all?projectId={}", second), &owner.token, json!({})).await;
    assert_eq!(res.data()["total"], 1);
}

#[tokio::test]
async fn contract_pages_use_the_capped_limit() {
    let app = TestApp::new();
    let owner = app.signup("producer@example.com").await;
    let project = app.create_project(&owner.token, "First").await;
    app.create_contract(&owner.token, &project).await;

    let max = cinea_api::config::config().filter.max_limit.unwrap_or(i32::MAX);
    let res = app
        .get(&format!("/contract/all?page=1&limit={}", max as i64 + 1), &owner.token)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["limit"], max);
    assert_eq!(res.data()["items"].as_array().unwrap().len(), 1);

    let res = app.get("/contract/all?page=2147483647&limit=50", &owner.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.data()["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn contract_lifecycle_rename_form_and_discard() {
    let app = TestApp::new();
    let owner = app.signup("producer@example.com").await;
    let other = app.signup("other@example.com").await;
    let project = app.create_project(&owner.token, "Feature").await;
    let contract = app.create_contract(&owner.token, &project).await;

    let res = app.get(&format!("/contract/{}", contract), &owner.token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "contract fetched successfully");
    assert_eq!(res.data()["name"], "Crew agreement");

    let res = app.get(&format!("/contract/{}", contract), &other.token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .post("/contract/update-name", &owner.token, json!({ "contractId": contract, "name": "Location release" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["name"], "Location release");

    let res = app.post("/contract/render-form", &owner.token, json!({ "formData": {} })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Please provide contractId");

    let first = app
        .post("/contract/render-form", &owner.token, json!({ "contractId": contract, "formData": { "fee": 100 } }))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.message(), "Contract form saved successfully");
    let second = app
        .post("/contract/render-form", &owner.token, json!({ "contractId": contract, "formData": { "fee": 250 } }))
        .await;
    assert_eq!(second.data()["_id"], first.data()["_id"]);
    assert_eq!(second.data()["formData"]["fee"], 250);

    let res = app.post("/contract/discord-contract", &owner.token, json!({ "contractId": contract })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Contract has been removed successfully");
    let res = app.get(&format!("/contract/{}", contract), &owner.token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn contract_files_are_sequenced_and_converted() {
    let app = TestApp::new();
    let owner = app.signup("producer@example.com").await;
    let project = app.create_project(&owner.token, "Feature").await;
    let contract = app.create_contract(&owner.token, &project).await;

    let res = app
        .upload(
            "/contract/files/upload",
            &owner.token,
            &[("contractId", contract.as_str())],
            &[("agreement.pdf", "application/pdf", PDF), ("rider.docx", "application/octet-stream", DOCX)],
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.message(), "Files uploaded successfully");
    let files = res.data().as_array().unwrap();
    assert_eq!(files[0]["sequence"], 1);
    assert_eq!(files[0]["conversionStatus"], "converted");
    assert_eq!(files[1]["sequence"], 2);
    assert_eq!(files[1]["conversionStatus"], "pending");
    assert!(files[0]["url"].as_str().unwrap().contains("contracts/"));

    // A later batch continues the numbering
    let res = app
        .upload("/contract/files/upload", &owner.token, &[("contractId", contract.as_str())], &[("annex.pdf", "application/pdf", PDF)])
        .await;
    assert_eq!(res.data()[0]["sequence"], 3);

    let docx_id = files[1]["_id"].as_str().unwrap().to_string();
    let res = app
        .request(
            Method::POST,
            "/contract/conversion-status",
            None,
            Some(json!({ "fileId": docx_id, "conversionStatus": "converted", "key": "converted/rider.pdf" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["convertedKey"], "converted/rider.pdf");

    let res = app.get(&format!("/contract/files?contractId={}", contract), &owner.token).await;
    assert_eq!(res.message(), "Files listed");
    let listed = res.data().as_array().unwrap();
    let sequences: Vec<i64> = listed.iter().map(|f| f["sequence"].as_i64().unwrap()).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert!(listed[1]["url"].as_str().unwrap().ends_with("converted/rider.pdf"));

    let res = app.delete(&format!("/contract/files/{}", docx_id), &owner.token).await;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.get(&format!("/contract/files?contractId={}", contract), &owner.token).await;
    assert_eq!(res.data().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn upload_requires_a_contract_and_files() {
    let app = TestApp::new();
    let owner = app.signup("producer@example.com").await;
    let project = app.create_project(&owner.token, "Feature").await;
    let contract = app.create_contract(&owner.token, &project).await;

    let res = app
        .upload("/contract/files/upload", &owner.token, &[], &[("a.pdf", "application/pdf", PDF)])
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Please provide contractId");

    let res = app.upload("/contract/files/upload", &owner.token, &[("contractId", contract.as_str())], &[]).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.post("/contract/files/upload", &owner.token, json!({ "contractId": contract })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhooks_validate_their_input() {
    let app = TestApp::new();

    let res = app
        .request(Method::POST, "/contract/conversion-status", None, Some(json!({ "conversionStatus": "converted" })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Please provide fileId");

    let res = app
        .request(
            Method::POST,
            "/contract/file-status",
            None,
            Some(json!({ "fileId": uuid::Uuid::new_v4(), "status": "failed" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .request(
            Method::POST,
            "/contract/file-status",
            None,
            Some(json!({ "fileId": uuid::Uuid::new_v4(), "status": "exploded" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhooks_require_the_configured_secret() {
    let app = TestApp::with_policy(RequestPolicy {
        webhook_secret: Some("converter-secret".to_string()),
        ..RequestPolicy::from_config()
    });
    let owner = app.signup("producer@example.com").await;
    let project = app.create_project(&owner.token, "Feature").await;
    let contract = app.create_contract(&owner.token, &project).await;
    let res = app
        .upload("/contract/files/upload", &owner.token, &[("contractId", contract.as_str())], &[("rider.docx", "application/octet-stream", DOCX)])
        .await;
    let file_id = res.data()[0]["_id"].as_str().unwrap().to_string();
    let body = json!({ "fileId": file_id, "status": "converted" });

    let res = app.request(Method::POST, "/contract/file-status", None, Some(body.clone())).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Invalid webhook secret");

    for (secret, expected) in [("wrong", StatusCode::UNAUTHORIZED), ("converter-secret", StatusCode::OK)] {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/contract/file-status")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-webhook-secret", secret)
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.send(request).await;
        assert_eq!(res.status, expected, "{}", res.body);
    }

    let res = app.get(&format!("/contract/files?contractId={}", contract), &owner.token).await;
    assert_eq!(res.data()[0]["conversionStatus"], "converted");
}

#[tokio::test]
async fn oversized_uploads_are_refused() {
    let app = TestApp::with_policy(RequestPolicy { max_upload_bytes: 1024, ..RequestPolicy::from_config() });
    let owner = app.signup("producer@example.com").await;
    let project = app.create_project(&owner.token, "Feature").await;
    let contract = app.create_contract(&owner.token, &project).await;

    let big = vec![b'x'; 4096];
    let res = app
        .upload("/contract/files/upload", &owner.token, &[("contractId", contract.as_str())], &[("scan.pdf", "application/pdf", big.as_slice())])
        .await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);

    let res = app.upload("/media/upload", &owner.token, &[], &[("still.png", "image/png", big.as_slice())]).await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);

    let res = app
        .upload("/contract/files/upload", &owner.token, &[("contractId", contract.as_str())], &[("a.pdf", "application/pdf", PDF)])
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
}

#[tokio::test]
async fn field_layouts_are_upserted_per_file() {
    let app = TestApp::new();
    let owner = app.signup("producer@example.com").await;
    let project = app.create_project(&owner.token, "Feature").await;
    let contract = app.create_contract(&owner.token, &project).await;
    let res = app
        .upload("/contract/files/upload", &owner.token, &[("contractId", contract.as_str())], &[("a.pdf", "application/pdf", PDF)])
        .await;
    let file_id = res.data()[0]["_id"].as_str().unwrap().to_string();

    let fields = json!([{ "type": "signature", "page": 1, "x": 120, "y": 640 }]);
    let first = app
        .post("/contract/fields", &owner.token, json!({ "contractId": contract, "fileId": file_id, "fields": fields }))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.message(), "Contract fields saved successfully");

    let second = app
        .post(
            "/contract/fields",
            &owner.token,
            json!({ "contractId": contract, "fileId": file_id, "fields": [{ "type": "date", "page": 2 }] }),
        )
        .await;
    assert_eq!(second.data()["_id"], first.data()["_id"]);

    let res = app
        .post(
            "/contract/fields",
            &owner.token,
            json!({ "contractId": contract, "fileId": uuid::Uuid::new_v4(), "fields": [] }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.get(&format!("/contract/fields?contractId={}", contract), &owner.token).await;
    let layouts = res.data().as_array().unwrap();
    assert_eq!(layouts.len(), 1);
    assert_eq!(layouts[0]["fields"][0]["type"], "date");
}
