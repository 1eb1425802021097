use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use deepseq_backend::{
    config::Config,
    db::Write,
    server::{AppState, app, auth::API_KEY_HEADER},
};
use deepseq_core::model::researcher::NewResearcher;
use diesel_async::RunQueryDsl;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const SEED_DATA: &str = include_str!("../../db/seed_data.json");
const BOUNDARY: &str = "deepseq-test-boundary";

struct TestApp {
    router: Router,
    app_state: AppState,
    admin_key: String,
    researcher_key: String,
    dir: TempDir,
}

struct TestResponse {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).map(|v| v.to_str().unwrap())
    }
}

// Enough percent-encoding for the JSON id lists sent in forms
fn form_encode(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('[', "%5B")
        .replace(']', "%5D")
        .replace(',', "%2C")
        .replace(' ', "+")
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, uri: &str, api_key: &str) -> TestResponse {
        let request = Request::get(uri)
            .header(API_KEY_HEADER, api_key)
            .body(Body::empty())
            .unwrap();

        self.send(request).await
    }

    async fn delete(&self, uri: &str, api_key: &str) -> TestResponse {
        let request = Request::delete(uri)
            .header(API_KEY_HEADER, api_key)
            .body(Body::empty())
            .unwrap();

        self.send(request).await
    }

    async fn post_json(&self, uri: &str, api_key: &str, body: &Value) -> TestResponse {
        let request = Request::post(uri)
            .header(API_KEY_HEADER, api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    async fn patch_json(&self, uri: &str, api_key: &str, body: &Value) -> TestResponse {
        let request = Request::patch(uri)
            .header(API_KEY_HEADER, api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    async fn post_form(&self, uri: &str, api_key: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(key, value)| format!("{key}={}", form_encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let request = Request::post(uri)
            .header(API_KEY_HEADER, api_key)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    async fn upload(
        &self,
        api_key: &str,
        request_id: i64,
        filename: &str,
        contents: &[u8],
    ) -> TestResponse {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"request_id\"\r\n\r\n\
             {request_id}\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::post("/requests/upload")
            .header(API_KEY_HEADER, api_key)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    fn stored_forms(&self) -> Vec<std::path::PathBuf> {
        let upload_dir = self.dir.path().join("media").join("deep_seq_requests");

        match std::fs::read_dir(upload_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn catalog_id(&self, endpoint: &str, name: &str) -> i64 {
        let entries = self.get(endpoint, &self.admin_key).await.json();

        entries
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["name"] == name)
            .unwrap()["id"]
            .as_i64()
            .unwrap()
    }

    async fn sample_payload(&self, name: &str) -> Value {
        json!({
            "name": name,
            "nucleic_acid_type": "DNA",
            "organism_id": self.catalog_id("/organisms", "Human").await,
            "read_length_id": self.catalog_id("/read_lengths", "2x75").await,
            "sequencing_depth": 15
        })
    }

    /// Creates samples as the researcher and returns their ids.
    async fn create_samples(&self, names: &[&str]) -> Vec<i64> {
        let mut payloads = Vec::new();
        for name in names {
            payloads.push(self.sample_payload(name).await);
        }

        let response = self
            .post_json("/samples", &self.researcher_key, &json!({ "data": payloads }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);

        response.json()["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["pk"].as_i64().unwrap())
            .collect()
    }

    /// Creates a request holding `sample_ids` as the researcher and returns its id.
    async fn create_request(&self, sample_ids: &[i64]) -> i64 {
        let samples = serde_json::to_string(sample_ids).unwrap();

        let response = self
            .post_form(
                "/requests/save",
                &self.researcher_key,
                &[
                    ("mode", "add"),
                    ("description", "whole genome"),
                    ("samples", &samples),
                ],
            )
            .await;
        assert_eq!(response.json(), json!({"success": true, "error": ""}));

        let requests = self.get("/requests", &self.researcher_key).await.json();

        requests["data"][0]["requestId"].as_i64().unwrap()
    }
}

async fn new_researcher(app_state: &AppState, email: &str, is_staff: bool) -> String {
    let mut db_conn = app_state.db_conn().await.unwrap();

    let created = NewResearcher {
        name: email.to_string(),
        email: email.to_string(),
        phone: String::new(),
        organization_id: None,
        pi_id: None,
        is_staff,
        cost_unit_ids: Vec::new(),
    }
    .write(&mut db_conn)
    .await
    .unwrap();

    created.api_key
}

#[fixture]
async fn test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("deepseq.sqlite3");
    let media_root = dir.path().join("media");

    let seed_data: Value = serde_json::from_str(SEED_DATA).unwrap();
    let config: Config = serde_json::from_value(json!({
        "db_url": db_path.to_str().unwrap(),
        "media_root": media_root.to_str().unwrap(),
        "media_url": "/media/",
        "seed_data": seed_data
    }))
    .unwrap();

    let app_state = AppState::initialize(config).await.unwrap();

    let admin_key = new_researcher(&app_state, "staff@example.com", true).await;
    let researcher_key = new_researcher(&app_state, "grace@example.com", false).await;

    TestApp {
        router: app(app_state.clone()),
        app_state,
        admin_key,
        researcher_key,
        dir,
    }
}

#[rstest]
#[awt]
#[tokio::test]
async fn health(#[future] test_app: TestApp) {
    let request = Request::get("/health").body(Body::empty()).unwrap();

    assert_eq!(test_app.send(request).await.status, StatusCode::OK);
}

#[rstest]
#[awt]
#[tokio::test]
async fn unknown_keys_are_rejected(#[future] test_app: TestApp) {
    let request = Request::get("/organisms").body(Body::empty()).unwrap();
    let response = test_app.send(request).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = test_app.get("/organisms", "not-a-real-key-at-all").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json(),
        json!({"success": false, "message": "invalid API key"})
    );
}

#[rstest]
#[awt]
#[tokio::test]
async fn catalogs_list_fallbacks_last(#[future] test_app: TestApp) {
    let names = |response: TestResponse| -> Vec<String> {
        response
            .json()
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap().to_string())
            .collect()
    };

    let organisms = names(test_app.get("/organisms", &test_app.researcher_key).await);
    assert_eq!(organisms, ["Human", "Mouse", "Zebrafish", "Other"]);

    let rna_protocols = names(
        test_app
            .get("/library_protocols?type=RNA", &test_app.researcher_key)
            .await,
    );
    assert_eq!(
        rna_protocols,
        ["SMART-Seq v4", "TruSeq Stranded mRNA", "Other - RNA Methods"]
    );

    let unmatchable = test_app
        .get("/indices/i7?index_type_id=abc", &test_app.researcher_key)
        .await;
    assert_eq!(unmatchable.status, StatusCode::OK);
    assert_eq!(unmatchable.json(), json!([]));
}

#[rstest]
#[awt]
#[tokio::test]
async fn batch_creation_reports_partial_success(#[future] test_app: TestApp) {
    let valid = test_app.sample_payload("sample-a").await;
    let mut invalid = test_app.sample_payload("sample-b").await;
    invalid["sequencing_depth"] = json!(0);

    let response = test_app
        .post_json(
            "/samples",
            &test_app.researcher_key,
            &json!({ "data": [valid, invalid.clone()] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "Invalid payload. Some records cannot be added."
    );
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = test_app
        .post_json(
            "/samples",
            &test_app.researcher_key,
            &json!({ "data": [invalid] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({"success": false, "message": "Invalid payload."})
    );

    let response = test_app
        .post_json("/samples", &test_app.researcher_key, &json!({ "data": [] }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[rstest]
#[awt]
#[tokio::test]
async fn single_records(#[future] test_app: TestApp) {
    let ids = test_app.create_samples(&["sample-c"]).await;

    let response = test_app
        .get(&format!("/samples/{}", ids[0]), &test_app.researcher_key)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["data"]["name"], "sample-c");

    let response = test_app
        .get("/samples/99999", &test_app.researcher_key)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.json(),
        json!({"success": false, "message": "Sample does not exist."})
    );

    let response = test_app
        .get("/libraries/abc", &test_app.researcher_key)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = test_app
        .delete(&format!("/samples/{}", ids[0]), &test_app.researcher_key)
        .await;
    assert_eq!(response.json(), json!({"success": true}));

    let response = test_app
        .get(&format!("/samples/{}", ids[0]), &test_app.researcher_key)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[rstest]
#[awt]
#[tokio::test]
async fn request_lifecycle(#[future] test_app: TestApp) {
    let sample_ids = test_app.create_samples(&["sample-d", "sample-e"]).await;
    let request_id = test_app.create_request(&sample_ids).await;

    let requests = test_app.get("/requests", &test_app.researcher_key).await.json();
    let summary = &requests["data"][0];
    assert_eq!(summary["name"], format!("Request{request_id}"));
    assert_eq!(summary["sumSeqDepth"], 30);

    let items = test_app
        .get(
            &format!("/requests/records?request_id={request_id}"),
            &test_app.researcher_key,
        )
        .await
        .json();
    assert_eq!(items["success"], true);
    assert_eq!(items["data"].as_array().unwrap().len(), 2);
    assert_eq!(items["data"][0]["recordType"], "S");

    let samples = test_app.get("/samples", &test_app.researcher_key).await.json();
    assert_eq!(samples["data"].as_array().unwrap().len(), 2);

    let response = test_app
        .post_form(
            "/requests/save",
            &test_app.researcher_key,
            &[
                ("mode", "edit"),
                ("request_id", &request_id.to_string()),
                ("description", "shallow sequencing"),
            ],
        )
        .await;
    assert_eq!(response.json(), json!({"success": true, "error": ""}));

    let response = test_app
        .post_form(
            "/requests/delete",
            &test_app.researcher_key,
            &[("request_id", &request_id.to_string())],
        )
        .await;
    assert_eq!(response.json(), json!({"success": true, "error": ""}));

    let response = test_app
        .get(
            &format!("/samples/{}", sample_ids[0]),
            &test_app.researcher_key,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let requests = test_app.get("/requests", &test_app.researcher_key).await.json();
    assert_eq!(requests["data"], json!([]));
}

#[rstest]
#[awt]
#[tokio::test]
async fn lifecycle_failures_keep_the_envelope(#[future] test_app: TestApp) {
    let response = test_app
        .post_form(
            "/requests/delete",
            &test_app.researcher_key,
            &[("request_id", "abc")],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());

    let response = test_app
        .post_form(
            "/requests/save",
            &test_app.researcher_key,
            &[("mode", "add"), ("description", "x"), ("samples", "[1, ")],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["success"], false);
}

#[rstest]
#[awt]
#[tokio::test]
async fn requests_are_private(#[future] test_app: TestApp) {
    let sample_ids = test_app.create_samples(&["sample-f"]).await;
    let request_id = test_app.create_request(&sample_ids).await;

    let staff_view = test_app.get("/requests", &test_app.admin_key).await.json();
    assert_eq!(staff_view["data"].as_array().unwrap().len(), 1);

    let response = test_app
        .post_json(
            "/researchers",
            &test_app.admin_key,
            &json!({"name": "Rosalind", "email": "rosalind@example.com"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let other_key = response.json()["data"]["api_key"]
        .as_str()
        .unwrap()
        .to_string();

    let other_view = test_app.get("/requests", &other_key).await.json();
    assert_eq!(other_view["data"], json!([]));

    let response = test_app
        .post_form(
            "/requests/delete",
            &other_key,
            &[("request_id", &request_id.to_string())],
        )
        .await;
    assert_eq!(response.json()["success"], false);
}

#[rstest]
#[awt]
#[tokio::test]
async fn only_staff_create_researchers(#[future] test_app: TestApp) {
    let response = test_app
        .post_json(
            "/researchers",
            &test_app.researcher_key,
            &json!({"name": "Mallory", "email": "mallory@example.com"}),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[rstest]
#[awt]
#[tokio::test]
async fn staff_manage_researchers(#[future] test_app: TestApp) {
    let response = test_app
        .post_json(
            "/researchers",
            &test_app.admin_key,
            &json!({"name": "Rosalind", "email": "rosalind@example.com"}),
        )
        .await;
    let id = response.json()["data"]["id"].as_i64().unwrap();

    let edit = json!({"name": "Rosalind Franklin", "phone": "555-0142"});

    let response = test_app
        .patch_json(&format!("/researchers/{id}"), &test_app.researcher_key, &edit)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = test_app
        .patch_json(&format!("/researchers/{id}"), &test_app.admin_key, &edit)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["data"]["name"], "Rosalind Franklin");
    assert_eq!(response.json()["data"]["phone"], "555-0142");

    let response = test_app
        .patch_json("/researchers/99999", &test_app.admin_key, &edit)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = test_app
        .delete(&format!("/researchers/{id}"), &test_app.researcher_key)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = test_app
        .delete(&format!("/researchers/{id}"), &test_app.admin_key)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"success": true}));
}

#[rstest]
#[awt]
#[tokio::test]
async fn researchers_with_requests_stay(#[future] test_app: TestApp) {
    let sample_ids = test_app.create_samples(&["sample-k"]).await;
    test_app.create_request(&sample_ids).await;

    let researchers = test_app.get("/researchers", &test_app.researcher_key).await.json();
    let own_id = researchers["data"][0]["id"].as_i64().unwrap();

    let response = test_app
        .delete(&format!("/researchers/{own_id}"), &test_app.admin_key)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(
        response.json(),
        json!({
            "success": false,
            "message": "researcher cannot be deleted while it still has request records"
        })
    );
}

#[rstest]
#[awt]
#[tokio::test]
async fn reports(#[future] test_app: TestApp) {
    let sample_ids = test_app.create_samples(&["sample-g"]).await;
    let request_id = test_app.create_request(&sample_ids).await;

    let response = test_app
        .get(
            &format!("/requests/pdf?request_id={request_id}"),
            &test_app.researcher_key,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        Some("application/pdf")
    );
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        Some(format!("inline; filename=\"Request{request_id}_Deep_Sequencing_Request.pdf\"").as_str())
    );
    assert!(response.body.starts_with(b"%PDF"));

    let response = test_app
        .get("/requests/pdf?request_id=99999", &test_app.researcher_key)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.header(header::CONTENT_TYPE),
        Some("application/pdf")
    );
    assert_eq!(response.header(header::CONTENT_DISPOSITION), None);
    assert!(response.body.starts_with(b"%PDF"));
}

#[rstest]
#[awt]
#[tokio::test]
async fn uploaded_forms_are_served(#[future] test_app: TestApp) {
    let sample_ids = test_app.create_samples(&["sample-h"]).await;
    let request_id = test_app.create_request(&sample_ids).await;

    let uploaded = test_app
        .upload(
            &test_app.researcher_key,
            request_id,
            "signed form.pdf",
            b"not really a pdf",
        )
        .await
        .json();
    assert_eq!(uploaded["success"], true);
    assert_eq!(uploaded["name"], "signed form.pdf");

    let path = uploaded["path"].as_str().unwrap();
    assert!(path.starts_with("/media/deep_seq_requests/"));
    assert!(path.ends_with("_signed_form.pdf"));

    let requests = test_app.get("/requests", &test_app.researcher_key).await.json();
    assert_eq!(requests["data"][0]["deepSeqRequestPath"], path);

    let served = test_app.get(path, &test_app.researcher_key).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.body, b"not really a pdf");
}

#[rstest]
#[awt]
#[tokio::test]
async fn pools(#[future] test_app: TestApp) {
    let library = json!({
        "name": "library-a",
        "library_protocol_id": test_app.catalog_id("/library_protocols", "NEBNext Ultra II DNA").await,
        "library_type_id": test_app.catalog_id("/library_types", "ChIP-Seq").await,
        "organism_id": test_app.catalog_id("/organisms", "Mouse").await,
        "read_length_id": test_app.catalog_id("/read_lengths", "1x50").await,
        "sequencing_depth": 25
    });

    let created = test_app
        .post_json("/libraries", &test_app.admin_key, &json!({ "data": [library] }))
        .await
        .json();
    let library_id = created["data"][0]["pk"].as_i64().unwrap();

    let response = test_app
        .post_json(
            "/pools",
            &test_app.admin_key,
            &json!({"name": "Pool 1", "library_ids": [library_id]}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let pool_id = response.json()["data"]["id"].as_i64().unwrap();

    let pool = test_app
        .get(&format!("/pools/{pool_id}"), &test_app.admin_key)
        .await
        .json();
    assert_eq!(pool["data"]["libraries"][0]["name"], "library-a");

    let response = test_app
        .post_json(
            "/pools",
            &test_app.admin_key,
            &json!({"name": "Pool 2", "library_ids": [99999]}),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[rstest]
#[awt]
#[tokio::test]
async fn large_forms_are_accepted(#[future] test_app: TestApp) {
    let sample_ids = test_app.create_samples(&["sample-i"]).await;
    let request_id = test_app.create_request(&sample_ids).await;

    let scan = vec![b'x'; 3 * 1024 * 1024];

    let uploaded = test_app
        .upload(&test_app.researcher_key, request_id, "scan.pdf", &scan)
        .await
        .json();
    assert_eq!(uploaded["success"], true, "{uploaded}");

    let served = test_app
        .get(uploaded["path"].as_str().unwrap(), &test_app.researcher_key)
        .await;
    assert_eq!(served.body.len(), scan.len());
}

#[rstest]
#[awt]
#[tokio::test]
async fn failed_uploads_leave_no_files(#[future] test_app: TestApp) {
    let sample_ids = test_app.create_samples(&["sample-j"]).await;
    let request_id = test_app.create_request(&sample_ids).await;

    let mut db_conn = test_app.app_state.db_conn().await.unwrap();
    diesel::sql_query(
        "create trigger reject_forms before insert on file_deep_seq_request \
         begin select raise(abort, 'forms are closed'); end",
    )
    .execute(&mut *db_conn)
    .await
    .unwrap();
    drop(db_conn);

    let response = test_app
        .upload(&test_app.researcher_key, request_id, "form.pdf", b"contents")
        .await
        .json();
    assert_eq!(response["success"], false);
    assert_eq!(test_app.stored_forms(), Vec::<std::path::PathBuf>::new());
}
