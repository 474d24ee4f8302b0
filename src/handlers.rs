// src/handlers.rs
use crate::{AppState, errors::HydraError, models::*};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use log::info;
use serde::Deserialize;
use uuid::Uuid;

/// Max side of the copy sent to the classifier.
const CLASSIFY_MAX_SIDE: u32 = 1024;

struct Part {
    name: String,
    content_type: String,
    data: Bytes,
}

impl Part {
    fn text(&self) -> Result<String, HydraError> {
        String::from_utf8(self.data.to_vec())
            .map(|s| s.trim().to_string())
            .map_err(|_| HydraError::Validation(format!("Field {} is not UTF-8", self.name)))
    }
}

async fn collect_parts(payload: &mut Multipart, max_bytes: usize) -> Result<Vec<Part>, Error> {
    let mut parts = Vec::new();

    while let Some(mut field) = payload.try_next().await? {
        let name = field
            .content_disposition()
            .get_name()
            .ok_or_else(|| HydraError::Validation("Unnamed multipart field".to_string()))?
            .to_string();

        let content_type = field
            .content_type()
            .map(|ct| ct.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut data = BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            if data.len() + chunk.len() > max_bytes {
                return Err(HydraError::Validation(format!(
                    "Field {} exceeds {} byte limit",
                    name, max_bytes
                ))
                .into());
            }
            data.extend_from_slice(&chunk);
        }

        parts.push(Part {
            name,
            content_type,
            data: data.freeze(),
        });
    }

    Ok(parts)
}

fn take_part(parts: &mut Vec<Part>, name: &str) -> Option<Part> {
    let index = parts.iter().position(|p| p.name == name)?;
    Some(parts.swap_remove(index))
}

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub scan_type: Option<String>,
}

pub async fn validate_image(
    mut payload: Multipart,
    query: web::Query<ValidateQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let expected = match query.scan_type.as_deref() {
        None => None,
        Some(raw) => match ScanLabel::parse(raw) {
            ScanLabel::Other => {
                return Err(HydraError::Validation(format!("Invalid scan type: {}", raw)).into());
            }
            label => Some(label),
        },
    };

    let mut parts = collect_parts(&mut payload, data.max_upload_bytes).await?;
    let file = take_part(&mut parts, "file")
        .ok_or_else(|| HydraError::Validation("Missing file field".to_string()))?;

    let processor = data.image_processor.clone();
    let input = web::block(move || {
        processor.prepare_for_classifier(&file.content_type, file.data, CLASSIFY_MAX_SIDE)
    })
    .await
    .map_err(|e| HydraError::Internal(format!("Image preparation failed: {}", e)))??;

    let classification = data.classifier.classify(&input.data, &input.mime_type).await?;

    let recognised = matches!(classification.label, ScanLabel::Tongue | ScanLabel::Urine);
    let consistent = expected.is_none_or(|e| e == classification.label);

    Ok(HttpResponse::Ok().json(ValidateResponse {
        accepted: recognised && consistent,
        label: classification.label,
        reason: classification.reason,
    }))
}

pub async fn create_report(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let mut parts = collect_parts(&mut payload, data.max_upload_bytes).await?;

    let urine = take_part(&mut parts, "urine").map(|p| p.data);
    let tongue = take_part(&mut parts, "tongue").map(|p| p.data);

    let profile = match take_part(&mut parts, "profile") {
        Some(part) => serde_json::from_slice::<UserProfile>(&part.data)
            .map_err(|e| HydraError::Validation(format!("Invalid profile: {}", e)))?,
        None => UserProfile::default(),
    };

    let test_date = take_part(&mut parts, "test_date")
        .map(|p| p.text())
        .transpose()?
        .filter(|s| !s.is_empty());

    let build = data
        .aggregator
        .build(urine, tongue, profile, test_date)
        .await;

    let report_id = Uuid::new_v4();
    let body =
        serde_json::to_vec(&build.report).map_err(|e| HydraError::Serialization(e.to_string()))?;

    data.blob_store
        .put(&report_key(&report_id), Bytes::from(body), "application/json")
        .await?;

    info!("Stored report {}", report_id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "report_id": report_id,
        "report": build.report
    })))
}

pub async fn get_report(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let report_id = path.into_inner();

    let blob = data.blob_store.get(&report_key(&report_id)).await?;
    let report: Report = serde_json::from_slice(&blob.data)
        .map_err(|e| HydraError::Serialization(e.to_string()))?;

    Ok(HttpResponse::Ok().json(&report))
}

#[derive(Debug, Deserialize)]
pub struct BlobQuery {
    pub expires: Option<i64>,
    pub sig: Option<String>,
}

pub async fn get_blob(
    path: web::Path<String>,
    query: web::Query<BlobQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let key = path.into_inner();

    let (Some(expires), Some(sig)) = (query.expires, query.sig.as_deref()) else {
        return Err(HydraError::Forbidden("Unsigned blob link".to_string()).into());
    };
    data.url_signer
        .verify(&key, expires, sig, chrono::Utc::now().timestamp())?;

    let blob = data.blob_store.get(&key).await?;

    Ok(HttpResponse::Ok()
        .content_type(blob.content_type)
        .body(blob.data))
}

fn report_key(report_id: &Uuid) -> String {
    format!("reports/{}.json", report_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::collaborators::{BlobStore, ImageClassifier, StoredBlob};
    use crate::services::image_processor::tests::png_bytes;
    use crate::services::tongue_analyzer::tests::synthetic_tongue;
    use crate::services::{ImageProcessor, ReportAggregator, UrlSigner};
    use actix_web::{App, http::StatusCode, test};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const BOUNDARY: &str = "hydrascan-test-boundary";

    #[derive(Default)]
    struct MemoryStore {
        blobs: Mutex<HashMap<String, StoredBlob>>,
    }

    #[async_trait]
    impl BlobStore for MemoryStore {
        async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), HydraError> {
            self.blobs.lock().unwrap().insert(
                key.to_string(),
                StoredBlob {
                    data,
                    content_type: content_type.to_string(),
                },
            );
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<StoredBlob, HydraError> {
            self.blobs
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| HydraError::NotFound(key.to_string()))
        }

        async fn sign_url(&self, _: &str) -> Result<String, HydraError> {
            Err(HydraError::Storage("unsigned".to_string()))
        }
    }

    struct FixedClassifier(ScanLabel);

    #[async_trait]
    impl ImageClassifier for FixedClassifier {
        async fn classify(&self, _: &[u8], _: &str) -> Result<Classification, HydraError> {
            Ok(Classification {
                label: self.0,
                reason: "fixture".to_string(),
            })
        }
    }

    fn state(label: ScanLabel) -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let state = AppState {
            blob_store: store.clone(),
            classifier: Arc::new(FixedClassifier(label)),
            aggregator: Arc::new(ReportAggregator::new(store.clone(), None, None)),
            image_processor: Arc::new(ImageProcessor::new(1024 * 1024)),
            url_signer: Arc::new(UrlSigner::new("test-secret")),
            max_upload_bytes: 1024 * 1024,
        };
        (state, store)
    }

    fn multipart(fields: &[(&str, Option<&str>, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, content_type, data) in fields {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            let disposition = match filename {
                Some(f) => format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    name, f
                ),
                None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", name),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn validate_image_checks_preselected_type() {
        let (state, _) = state(ScanLabel::Tongue);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/validate-image", web::post().to(validate_image)),
        )
        .await;
        let png = png_bytes(&synthetic_tongue());

        let body = multipart(&[("file", Some("t.png"), "image/png", png.as_slice())]);
        let resp: serde_json::Value = test::call_and_read_body_json(
            &app,
            multipart_request("/validate-image?scan_type=tongue", body).to_request(),
        )
        .await;
        assert_eq!(resp["accepted"], true);
        assert_eq!(resp["label"], "tongue");

        let body = multipart(&[("file", Some("t.png"), "image/png", png.as_slice())]);
        let resp: serde_json::Value = test::call_and_read_body_json(
            &app,
            multipart_request("/validate-image?scan_type=urine", body).to_request(),
        )
        .await;
        assert_eq!(resp["accepted"], false);

        let body = multipart(&[("file", Some("t.gif"), "image/gif", png.as_slice())]);
        let resp = test::call_service(
            &app,
            multipart_request("/validate-image", body).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn created_reports_can_be_fetched() {
        let (state, store) = state(ScanLabel::Other);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/reports", web::post().to(create_report))
                .route("/reports/{report_id}", web::get().to(get_report)),
        )
        .await;

        let png = png_bytes(&synthetic_tongue());
        let body = multipart(&[
            ("tongue", Some("t.png"), "image/png", png.as_slice()),
            ("profile", None, "application/json", &br#"{"age": 40, "gender": "male"}"#[..]),
            ("test_date", None, "text/plain", &b"Oct 17, 2026"[..]),
        ]);
        let created: serde_json::Value =
            test::call_and_read_body_json(&app, multipart_request("/reports", body).to_request())
                .await;

        let report = &created["report"];
        assert_eq!(report["testDate"], "Oct 17, 2026");
        assert_eq!(report["userProfile"]["age"], 40);
        assert!(report["urineAnalysis"]["metrics"].is_null());
        assert!(report["tongueAnalysis"]["metrics"].is_object());
        assert_eq!(report["recommendedDrinks"].as_array().unwrap().len(), 1);
        assert_eq!(report["recommendedDrinks"][0]["img"], "/drinks/regular.png");

        let id = created["report_id"].as_str().unwrap();
        assert!(store
            .blobs
            .lock()
            .unwrap()
            .contains_key(&format!("reports/{}.json", id)));

        let fetched: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri(&format!("/reports/{}", id))
                .to_request(),
        )
        .await;
        assert_eq!(&fetched, report);

        let missing = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/reports/{}", Uuid::new_v4()))
                .to_request(),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn blob_links_need_a_valid_signature() {
        let (state, store) = state(ScanLabel::Other);
        let signer = state.url_signer.clone();
        store
            .put("drinks/zero.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        store
            .put("reports/abc.json", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/blobs/{key:.*}", web::get().to(get_blob)),
        )
        .await;

        let get = |uri: String| test::TestRequest::get().uri(&uri).to_request();
        let future = chrono::Utc::now().timestamp() + 60;
        let sig = signer.sign("drinks/zero.png", future).unwrap();

        let resp = test::call_service(
            &app,
            get(format!("/blobs/drinks/zero.png?expires={}&sig={}", future, sig)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, Bytes::from_static(b"png"));

        // unsigned, signed for another key, and tampered expiry
        for uri in [
            format!("/blobs/reports/abc.json?expires={}", future),
            format!("/blobs/reports/abc.json?expires={}&sig={}", future, sig),
            format!("/blobs/drinks/zero.png?expires={}&sig={}", future + 1, sig),
        ] {
            let resp = test::call_service(&app, get(uri)).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        }

        let past = chrono::Utc::now().timestamp() - 60;
        let sig = signer.sign("drinks/zero.png", past).unwrap();
        let resp = test::call_service(
            &app,
            get(format!("/blobs/drinks/zero.png?expires={}&sig={}", past, sig)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
