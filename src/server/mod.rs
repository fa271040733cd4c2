// SPDX-License-Identifier: MIT

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::error::{EvalError, VerdictError};
use crate::predicate::{self, EvalResult, EvaluationContext, Node, GRAMMAR_SCHEMA};
use crate::rules::{
    CompiledPredicate, FieldCatalog, Rule, RuleBook, RuleBookLoader, RuleOutcome, RuleRegistry,
    RuleSummary,
};

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: RuleRegistry,
    pub catalog: Arc<FieldCatalog>,
    pub max_depth: usize,
}

impl AppState {
    pub async fn new(book: RuleBook, max_depth: usize) -> Self {
        let catalog = Arc::new(book.fields.clone());
        Self {
            registry: RuleRegistry::from_book(book).await,
            catalog,
            max_depth,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/grammar", get(grammar))
        .route("/api/evaluate", post(evaluate))
        .route("/api/render", post(render))
        .route("/api/rules", get(list_rules))
        .route("/api/rules/{id}", get(get_rule))
        .route("/api/rules/{id}/evaluate", post(evaluate_rule))
        .route("/api/check", post(check))
        .route("/api/intake", post(intake))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(config: ServerConfig) -> Result<(), VerdictError> {
    let book = match &config.rules_path {
        Some(path) => RuleBookLoader::new()
            .with_max_depth(config.max_depth)
            .load(path)?,
        None => {
            log::warn!("No rule book configured; serving ad-hoc evaluation only");
            RuleBook::default()
        }
    };
    let app = router(AppState::new(book, config.max_depth).await);

    let addr: SocketAddr = config
        .address()
        .parse()
        .map_err(|e| VerdictError::config(format!("invalid address {}: {}", config.address(), e)))?;
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Error body returned by handlers: `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Deserialize)]
struct EvaluateRequest {
    /// AST as a JSON object, or as JSON text
    ast: Value,
    #[serde(default)]
    context: Value,
}

#[derive(Deserialize)]
struct RenderRequest {
    ast: Value,
}

#[derive(Deserialize)]
struct ContextRequest {
    #[serde(default)]
    context: Value,
}

#[derive(Deserialize)]
struct IntakeRequest {
    reply: String,
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn grammar() -> Json<Value> {
    Json(GRAMMAR_SCHEMA.clone())
}

async fn evaluate(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvalResult>, ApiError> {
    let Json(payload) = payload?;
    let ctx = context_from(&payload.context)?;
    Ok(Json(evaluate_ast(&payload.ast, &ctx, state.max_depth)))
}

async fn render(
    State(state): State<AppState>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    let node = parse_ast(&payload.ast, state.max_depth)
        .map_err(|e| ApiError::unprocessable(e.to_string()))?;
    Ok(Json(json!({ "rendered": predicate::render(&node) })))
}

async fn list_rules(State(state): State<AppState>) -> Json<Vec<RuleSummary>> {
    Json(state.registry.list().await)
}

async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Rule>, ApiError> {
    match state.registry.get(&id).await {
        Some(rule) => Ok(Json(rule.as_ref().clone())),
        None => Err(ApiError::not_found(VerdictError::rule_not_found(id).to_string())),
    }
}

async fn evaluate_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ContextRequest>, JsonRejection>,
) -> Result<Json<EvalResult>, ApiError> {
    let rule = state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| ApiError::not_found(VerdictError::rule_not_found(&id).to_string()))?;
    let Json(payload) = payload?;
    let ctx = context_from(&payload.context)?;
    log::info!("Evaluating rule {} against {} fields", id, ctx.len());
    Ok(Json(rule.evaluate_with_limit(&ctx, state.max_depth)))
}

async fn check(
    State(state): State<AppState>,
    payload: Result<Json<ContextRequest>, JsonRejection>,
) -> Result<Json<Vec<RuleOutcome>>, ApiError> {
    let Json(payload) = payload?;
    let ctx = context_from(&payload.context)?;
    let outcomes = state.registry.check_with_limit(&ctx, state.max_depth).await;
    log::info!(
        "Checked {} rules, {} triggered",
        outcomes.len(),
        outcomes.iter().filter(|o| o.triggered).count()
    );
    Ok(Json(outcomes))
}

async fn intake(
    State(state): State<AppState>,
    payload: Result<Json<IntakeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    let compiled = CompiledPredicate::parse_with_limit(&payload.reply, state.max_depth)
        .and_then(|c| c.check_fields(&state.catalog).map(|_| c))
        .map_err(|e| ApiError::unprocessable(e.to_string()))?;
    Ok(Json(json!({
        "ast": compiled.ast,
        "summary": compiled.summary,
        "rendered": compiled.rendered(),
    })))
}

/// Missing or null context means an empty one
fn context_from(raw: &Value) -> Result<EvaluationContext, ApiError> {
    if raw.is_null() {
        return Ok(EvaluationContext::new());
    }
    EvaluationContext::from_json(raw).map_err(|e| ApiError::unprocessable(e.to_string()))
}

fn parse_ast(raw: &Value, max_depth: usize) -> Result<Node, EvalError> {
    match raw {
        Value::String(text) => predicate::parse_with_limit(text, max_depth),
        other => predicate::from_json_with_limit(other, max_depth),
    }
}

fn evaluate_ast(raw: &Value, ctx: &EvaluationContext, max_depth: usize) -> EvalResult {
    match raw {
        Value::String(text) => predicate::evaluate_from_str_with_limit(text, ctx, max_depth),
        other => match predicate::from_json_with_limit(other, max_depth) {
            Ok(node) => predicate::evaluate_with_limit(&node, ctx, max_depth),
            Err(err) => EvalResult::failure(&err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const BOOK: &str = r#"
fields:
  - { name: invoice_amount, type: number, example: 12000 }
  - { name: customer_tier, type: string, example: gold }
rules:
  - id: invoice_gate
    kind: constraint
    severity: block
    message: Invoice requires approval
    ast: { type: comparison, op: ">", left: { type: field, name: invoice_amount }, right: { type: const, value: 10000 } }
  - id: platinum_only
    ast: { type: comparison, op: eq, left: { type: field, name: customer_tier }, right: { type: const, value: platinum } }
"#;

    async fn app() -> Router {
        app_with_depth(64).await
    }

    async fn app_with_depth(max_depth: usize) -> Router {
        let book = RuleBookLoader::parse_yaml(BOOK).unwrap();
        router(AppState::new(book, max_depth).await)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = match body {
            Some(b) => Body::from(b.to_string()),
            None => Body::empty(),
        };
        send_body(app, method, uri, body).await
    }

    async fn send_body(app: Router, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .method(method)
            .header("Content-Type", "application/json")
            .body(body)
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app().await, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_grammar() {
        let (status, body) = send(app().await, "GET", "/api/grammar", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["$defs"]["node"]["oneOf"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_evaluate_object_ast() {
        let body = json!({
            "ast": {"type": "comparison", "op": ">", "left": {"type": "field", "name": "invoice_amount"}, "right": {"type": "const", "value": 10000}},
            "context": {"invoice_amount": 12000}
        });
        let (status, body) = send(app().await, "POST", "/api/evaluate", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pass"], true);
        assert_eq!(body["trace"]["children"][0]["value"], 12000);
        assert_eq!(body["trace"]["children"][1]["value"], 10000);
    }

    #[tokio::test]
    async fn test_evaluate_text_ast() {
        let body = json!({"ast": "{not json", "context": {}});
        let (status, body) = send(app().await, "POST", "/api/evaluate", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pass"], false);
        assert_eq!(body["error"], "Invalid JSON");
        assert_eq!(body["trace"]["label"], "parse error");

        let body = json!({"ast": r#"{"type":"const","value":true}"#});
        let (_, body) = send(app().await, "POST", "/api/evaluate", Some(body)).await;
        assert_eq!(body["pass"], true);
    }

    #[tokio::test]
    async fn test_evaluate_bad_context() {
        let body = json!({"ast": {"type": "const", "value": 1}, "context": {"lines": [1]}});
        let (status, body) = send(app().await, "POST", "/api/evaluate", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("lines"));
    }

    #[tokio::test]
    async fn test_render() {
        let body = json!({"ast": {"type": "logical", "op": "not", "left": {"type": "field", "name": "x"}}});
        let (status, body) = send(app().await, "POST", "/api/render", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rendered"], "NOT x");

        let body = json!({"ast": {"type": "nope"}});
        let (status, _) = send(app().await, "POST", "/api/render", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_list_and_get_rules() {
        let (status, body) = send(app().await, "GET", "/api/rules", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "invoice_gate");
        assert_eq!(body[0]["rendered"], "(invoice_amount > 10000)");
        assert_eq!(body[1]["rendered"], "(customer_tier = \"platinum\")");

        let (status, body) = send(app().await, "GET", "/api/rules/invoice_gate", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["severity"], "block");
        assert_eq!(body["ast"]["op"], ">");

        let (status, body) = send(app().await, "GET", "/api/rules/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Rule 'missing' not found");
    }

    #[tokio::test]
    async fn test_evaluate_rule() {
        let body = json!({"context": {"invoice_amount": 500}});
        let (status, body) =
            send(app().await, "POST", "/api/rules/invoice_gate/evaluate", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pass"], false);
        assert!(body.get("error").is_none());

        let (status, _) = send(
            app().await,
            "POST",
            "/api/rules/missing/evaluate",
            Some(json!({"context": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_check() {
        let body = json!({"context": {"invoice_amount": 12000, "customer_tier": "gold"}});
        let (status, body) = send(app().await, "POST", "/api/check", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        let outcomes = body.as_array().unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0]["rule_id"], "invoice_gate");
        assert_eq!(outcomes[0]["triggered"], true);
        assert_eq!(outcomes[0]["message"], "Invoice requires approval");
        assert_eq!(outcomes[1]["triggered"], false);
    }

    #[tokio::test]
    async fn test_intake() {
        let reply = r#"```json
{"ast":{"type":"comparison","op":">","left":{"type":"field","name":"invoice_amount"},"right":{"type":"const","value":5000}},"summary":"Flag invoices over 5,000."}
```"#;
        let (status, body) =
            send(app().await, "POST", "/api/intake", Some(json!({"reply": reply}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rendered"], "(invoice_amount > 5000)");
        assert_eq!(body["summary"], "Flag invoices over 5,000.");

        let reply = r#"{"ast":{"type":"field","name":"margin"},"summary":""}"#;
        let (status, body) =
            send(app().await, "POST", "/api/intake", Some(json!({"reply": reply}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("Unknown field: margin"));
    }

    #[tokio::test]
    async fn test_bad_request_bodies_answer_with_json_error() {
        let (status, body) =
            send(app().await, "POST", "/api/render", Some(json!({"tree": 1}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("missing field `ast`"));

        let (status, body) =
            send(app().await, "POST", "/api/intake", Some(json!({"text": "hi"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());

        let (status, body) =
            send_body(app().await, "POST", "/api/check", Body::from("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_deeply_nested_text_ast_is_malformed() {
        let mut text = r#"{"type":"const","value":true}"#.to_string();
        for _ in 0..200 {
            text = format!(r#"{{"type":"logical","op":"not","left":{}}}"#, text);
        }
        let (status, body) =
            send(app().await, "POST", "/api/evaluate", Some(json!({"ast": text}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pass"], false);
        assert_eq!(body["error"], "Malformed AST: AST exceeds maximum depth of 64");
        assert_eq!(body["trace"]["label"], "error");
    }

    #[tokio::test]
    async fn test_configured_depth_applies_to_every_route() {
        let ctx = json!({"context": {"invoice_amount": 12000, "customer_tier": "gold"}});

        let (_, body) =
            send(app_with_depth(1).await, "POST", "/api/rules/invoice_gate/evaluate", Some(ctx.clone())).await;
        assert_eq!(body["error"], "AST exceeds maximum depth of 1");

        let (_, body) = send(app_with_depth(1).await, "POST", "/api/check", Some(ctx)).await;
        assert!(body.as_array().unwrap().iter().all(|o| o["triggered"] == false));

        let reply = r#"{"ast":{"type":"comparison","op":">","left":{"type":"field","name":"invoice_amount"},"right":{"type":"const","value":5000}}}"#;
        let (status, _) =
            send(app_with_depth(2).await, "POST", "/api/intake", Some(json!({"reply": reply}))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) =
            send(app_with_depth(1).await, "POST", "/api/intake", Some(json!({"reply": reply}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("maximum depth of 1"));
    }
}
