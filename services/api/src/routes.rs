use crate::infra::{deserialize_optional_date, AppState, DeclarationState};
use asycuda_export::error::AppError;
use asycuda_export::workflows::declaration::{
    Declaration, DeclarationHeader, DeclarationTotals, Entity,
};
use asycuda_export::workflows::encoders::OutputFormat;
use asycuda_export::workflows::feedback::{
    describe_error, describe_report, ProcessingContext, UserFacingError, ValidationFeedback,
};
use asycuda_export::workflows::reference::CodeDetail;
use asycuda_export::workflows::resolution::{
    FieldResolutionEngine, MatchMethod, ReferenceSource, RowIssue, WeightEstimate,
};
use asycuda_export::workflows::sales::SalesImporter;
use asycuda_export::workflows::validation::ValidationReport;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

pub(crate) fn router() -> axum::Router {
    axum::Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/declarations", post(declaration_endpoint))
        .route("/api/v1/classifications", post(classification_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeclarationRequest {
    pub(crate) sales_csv: String,
    #[serde(default)]
    pub(crate) reference_csv: Option<String>,
    pub(crate) exporter: Entity,
    /// Defaults to the exporter when absent.
    #[serde(default)]
    pub(crate) declarant: Option<Entity>,
    #[serde(default)]
    pub(crate) registration_number: Option<String>,
    #[serde(default)]
    pub(crate) commercial_reference: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) date: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) settings: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MethodCount {
    pub(crate) method: MatchMethod,
    pub(crate) count: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct LowConfidenceLine {
    pub(crate) item_number: u32,
    pub(crate) description: String,
    pub(crate) code: String,
    pub(crate) confidence: u8,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResolutionSummary {
    pub(crate) items: usize,
    pub(crate) methods: Vec<MethodCount>,
    pub(crate) low_confidence: Vec<LowConfidenceLine>,
    pub(crate) issues: Vec<RowIssue>,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct RenderedText {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) xml: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) txt: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeclarationResponse {
    pub(crate) valid: bool,
    pub(crate) declaration: Declaration,
    pub(crate) totals: DeclarationTotals,
    pub(crate) resolution: ResolutionSummary,
    pub(crate) validation: ValidationReport,
    pub(crate) feedback: Vec<ValidationFeedback>,
    pub(crate) outputs: RenderedText,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) output_errors: Vec<UserFacingError>,
}

/// Parsing, matching and rendering are CPU-bound, so they run on the blocking pool.
pub(crate) async fn declaration_endpoint(
    Extension(state): Extension<DeclarationState>,
    Json(payload): Json<DeclarationRequest>,
) -> Result<Json<DeclarationResponse>, AppError> {
    let response = tokio::task::spawn_blocking(move || build_declaration(&state, payload))
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))??;
    Ok(Json(response))
}

pub(crate) fn build_declaration(
    state: &DeclarationState,
    payload: DeclarationRequest,
) -> Result<DeclarationResponse, AppError> {
    let DeclarationRequest {
        sales_csv,
        reference_csv,
        exporter,
        declarant,
        registration_number,
        commercial_reference,
        date,
        settings: overrides,
    } = payload;

    exporter.check()?;
    let exporter = Arc::new(exporter);
    let declarant = match declarant {
        Some(declarant) => {
            declarant.check()?;
            Arc::new(declarant)
        }
        None => exporter.clone(),
    };

    let mut settings = state.settings.clone();
    settings.apply_overrides(
        overrides
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str())),
    )?;

    let reference = state.reference_for(reference_csv)?;
    let rows = SalesImporter::from_reader(
        Cursor::new(sales_csv.into_bytes()),
        &state.resolution.columns,
    )?;

    let header = DeclarationHeader {
        registration_number,
        commercial_reference,
        issue_date: date,
        ..DeclarationHeader::new(exporter, declarant)
    };
    let pipeline = state.pipeline(reference, settings);
    let mut run = pipeline.run(&rows, header);

    let mut outputs = RenderedText::default();
    let mut output_errors = Vec::new();
    for output in run.render_formats(&[OutputFormat::Markup, OutputFormat::Delimited]) {
        match output.result {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                match output.format {
                    OutputFormat::Markup => outputs.xml = Some(text),
                    _ => outputs.txt = Some(text),
                }
            }
            Err(err) => output_errors.push(describe_error(
                &AppError::from(err),
                ProcessingContext::ExportFormatGeneration,
            )),
        }
    }

    let resolution = ResolutionSummary {
        items: run.outcome.items.len(),
        methods: run
            .outcome
            .method_counts()
            .into_iter()
            .map(|(method, count)| MethodCount { method, count })
            .collect(),
        low_confidence: run
            .outcome
            .low_confidence()
            .map(|resolved| LowConfidenceLine {
                item_number: resolved.item.item_number,
                description: resolved.item.description.clone(),
                code: resolved.classification.code.clone(),
                confidence: resolved.classification.confidence,
            })
            .collect(),
        issues: run.outcome.issues.clone(),
    };

    Ok(DeclarationResponse {
        valid: run.is_valid(),
        totals: run.declaration.totals(),
        feedback: describe_report(&run.report),
        declaration: run.declaration,
        resolution,
        validation: run.report,
        outputs,
        output_errors,
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClassificationRequest {
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) quantity: Option<f64>,
    #[serde(default)]
    pub(crate) product_code: Option<String>,
    #[serde(default)]
    pub(crate) reference_csv: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassificationResponse {
    pub(crate) description: String,
    pub(crate) code: String,
    pub(crate) method: MatchMethod,
    pub(crate) confidence: u8,
    pub(crate) low_confidence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) detail: Option<CodeDetail>,
    pub(crate) quantity: f64,
    pub(crate) weight: WeightEstimate,
    pub(crate) previous_document: String,
    pub(crate) reference_source: ReferenceSource,
}

pub(crate) async fn classification_endpoint(
    Extension(state): Extension<DeclarationState>,
    Json(payload): Json<ClassificationRequest>,
) -> Result<Json<ClassificationResponse>, AppError> {
    let reference = state.reference_for(payload.reference_csv)?;
    let engine = state.engine(reference);
    let quantity = payload
        .quantity
        .filter(|quantity| quantity.is_finite() && *quantity > 0.0)
        .unwrap_or(1.0);

    Ok(Json(classify(
        &engine,
        &payload.description,
        payload.product_code.as_deref(),
        quantity,
    )))
}

/// Runs one description through the matcher, weight estimator and document resolver.
pub(crate) fn classify(
    engine: &FieldResolutionEngine,
    description: &str,
    product_code: Option<&str>,
    quantity: f64,
) -> ClassificationResponse {
    let classification = engine.matcher().classify(description);
    let weight = engine
        .weights()
        .estimate(Some(&classification.code), Some(description), quantity);
    let (previous_document, reference_source) = engine.documents().resolve_with_source(
        product_code,
        Some(description),
        Some(&classification.code),
    );

    ClassificationResponse {
        description: description.trim().to_uppercase(),
        low_confidence: classification.is_low_confidence(),
        code: classification.code,
        method: classification.method,
        confidence: classification.confidence,
        detail: classification.detail,
        quantity,
        weight,
        previous_document,
        reference_source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asycuda_export::config::ResolutionConfig;
    use asycuda_export::workflows::reference::ReferenceDataStore;

    const SALES_CSV: &str = "ITEM SOLD,number,DF US$,BAR CODE\n\
        LADIES STRAW HAT,1,25.00,\n\
        ,1,4.00,\n\
        MENS LINEN SHIRT,2,$80.00,\n";

    fn state() -> DeclarationState {
        DeclarationState::new(
            Arc::new(ReferenceDataStore::new()),
            ResolutionConfig::default(),
        )
    }

    fn exporter() -> Entity {
        Entity::new(
            "EXP001",
            "Island Duty Free Ltd",
            "1 Rodney Bay Marina",
            "Gros Islet",
            "LC",
        )
        .expect("valid exporter")
    }

    fn request() -> DeclarationRequest {
        DeclarationRequest {
            sales_csv: SALES_CSV.to_string(),
            reference_csv: None,
            exporter: exporter(),
            declarant: None,
            registration_number: Some("A202510011200".to_string()),
            commercial_reference: None,
            date: NaiveDate::from_ymd_opt(2025, 10, 1),
            settings: BTreeMap::from([("customs_office".to_string(), "LCCAP".to_string())]),
        }
    }

    #[tokio::test]
    async fn declaration_endpoint_builds_outputs_and_report() {
        let Json(body) = declaration_endpoint(Extension(state()), Json(request()))
            .await
            .expect("declaration builds");

        assert!(body.valid);
        assert_eq!(body.declaration.customs_office, "LCCAP");
        assert_eq!(body.declaration.items().len(), 2);
        assert_eq!(body.totals.total_value, 105.0);
        assert_eq!(body.resolution.items, 2);
        let xml = body.outputs.xml.expect("xml output");
        assert!(xml.contains("<RegistrationNumber>A202510011200</RegistrationNumber>"));
        let txt = body.outputs.txt.expect("txt output");
        assert!(txt.starts_with("H|A202510011200|EX3|LCCAP|01/10/2025|"));
        assert_eq!(body.validation.contexts().count(), 3);
        assert_eq!(body.feedback.len(), 3);
        assert!(body.output_errors.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_declarations_complete_independently() {
        let state = state();
        let mut second = request();
        second.registration_number = Some("A202510011201".to_string());

        let (first, second) = tokio::join!(
            declaration_endpoint(Extension(state.clone()), Json(request())),
            declaration_endpoint(Extension(state), Json(second)),
        );
        let Json(first) = first.expect("first declaration builds");
        let Json(second) = second.expect("second declaration builds");
        assert_eq!(first.declaration.registration_number, "A202510011200");
        assert_eq!(second.declaration.registration_number, "A202510011201");
        assert_eq!(first.totals.total_value, second.totals.total_value);
    }

    #[test]
    fn declarations_build_outside_a_runtime() {
        let response = build_declaration(&state(), request()).expect("declaration builds");
        assert!(response.valid);
        assert_eq!(response.resolution.items, 2);
    }

    #[tokio::test]
    async fn unknown_setting_is_a_bad_request() {
        let mut request = request();
        request
            .settings
            .insert("colour".to_string(), "blue".to_string());

        let err = declaration_endpoint(Extension(state()), Json(request))
            .await
            .expect_err("unknown setting rejected");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_sales_columns_are_reported() {
        let mut request = request();
        request.sales_csv = "Product,Qty\nHAT,1\n".to_string();

        let err = declaration_endpoint(Extension(state()), Json(request))
            .await
            .expect_err("missing columns rejected");
        assert!(err.to_string().contains("ITEM SOLD"));
    }

    #[tokio::test]
    async fn classification_endpoint_scales_weight_by_quantity() {
        let request = ClassificationRequest {
            description: "ladies straw hat".to_string(),
            quantity: Some(3.0),
            product_code: None,
            reference_csv: None,
        };
        let Json(body) = classification_endpoint(Extension(state()), Json(request))
            .await
            .expect("classification succeeds");

        assert_eq!(body.method, MatchMethod::Keyword);
        assert!(body.code.starts_with("6504"));
        assert!((body.weight.gross - 0.6).abs() < 1e-9);
        assert!((body.weight.net - 0.45).abs() < 1e-9);
        assert_eq!(body.reference_source, ReferenceSource::Synthesized);
    }

    #[tokio::test]
    async fn classification_uses_request_reference() {
        let request = ClassificationRequest {
            description: "Ladies Straw Hat".to_string(),
            quantity: None,
            product_code: None,
            reference_csv: Some(
                "HS Code,Description,Origin,Office,C Nbr,Line,Year\n\
                 65040090,LADIES STRAW HAT,CN,LCCAP,20455,3,2024\n"
                    .to_string(),
            ),
        };
        let Json(body) = classification_endpoint(Extension(state()), Json(request))
            .await
            .expect("classification succeeds");

        assert_eq!(body.code, "65040090");
        assert_eq!(body.method, MatchMethod::Exact);
        assert_eq!(body.confidence, 100);
        assert_eq!(body.previous_document, "LCCAP 2024 C 20455 art. 3");
    }

    #[tokio::test]
    async fn classification_route_accepts_json() {
        use tower::ServiceExt;

        let app = router().layer(Extension(state()));
        let response = app
            .oneshot(
                axum::http::Request::post("/api/v1/classifications")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(axum::body::Body::from(
                        json!({ "description": "COSMETIC BAG", "quantity": 2 }).to_string(),
                    ))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let payload: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(payload["method"], "keyword");
        assert_eq!(payload["quantity"], 2.0);
    }
}
