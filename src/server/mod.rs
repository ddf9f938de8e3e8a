// SPDX-License-Identifier: MIT

//! Admin HTTP API
//!
//! Serves the active rule set to classifying clients, in both formula and
//! tree form, and gives administrators validate/test/conflict endpoints for
//! checking a formula before it is saved.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::error::{RuleError, RuleResult};
use crate::formula::{self, DraftConflict, RuleConflict};
use crate::rules::{derive_trees, Rule, RuleStore, TreeRule};

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn RuleStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self { store }
    }
}

type ApiError = (StatusCode, Json<Value>);

fn store_error(e: RuleError) -> ApiError {
    log::error!("Rule store failed: {}", e);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": e.to_string() })),
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/rules/active", get(list_active_rules))
        .route("/api/rules/active/tree", get(list_active_rules_tree))
        .route("/api/rules/validate", post(validate_formula))
        .route("/api/rules/test", post(test_formula))
        .route("/api/rules/conflicts", post(find_conflicts))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind to localhost on `port` and serve until the process exits
pub async fn serve(port: u16, store: Arc<dyn RuleStore>) -> RuleResult<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_on(listener, store).await
}

/// Serve on an already bound listener
pub async fn serve_on(listener: tokio::net::TcpListener, store: Arc<dyn RuleStore>) -> RuleResult<()> {
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(AppState::new(store))).await?;
    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_active_rules(State(state): State<AppState>) -> Result<Json<Vec<Rule>>, ApiError> {
    let rules = state.store.list_active_rules().await.map_err(store_error)?;
    Ok(Json(rules))
}

async fn list_active_rules_tree(
    State(state): State<AppState>,
) -> Result<Json<Vec<TreeRule>>, ApiError> {
    let rules = state.store.list_active_rules().await.map_err(store_error)?;
    Ok(Json(derive_trees(&rules)))
}

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    formula: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidateResponse {
    fn check(formula: &str) -> Self {
        match formula::validate(formula) {
            Ok(()) => Self {
                valid: true,
                reason: None,
            },
            Err(e) => Self {
                valid: false,
                reason: Some(e.to_string()),
            },
        }
    }
}

async fn validate_formula(Json(payload): Json<ValidateRequest>) -> Json<ValidateResponse> {
    Json(ValidateResponse::check(&payload.formula))
}

#[derive(Debug, Deserialize)]
struct TestRequest {
    formula: String,
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct NameResult {
    pub name: String,
    pub matched: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TestResponse {
    #[serde(flatten)]
    pub validation: ValidateResponse,
    pub results: Vec<NameResult>,
}

async fn test_formula(Json(payload): Json<TestRequest>) -> Json<TestResponse> {
    let results = match formula::parse(&payload.formula) {
        Ok(expr) => payload
            .names
            .into_iter()
            .map(|name| NameResult {
                matched: expr.matches(&name),
                name,
            })
            .collect(),
        Err(_) => vec![],
    };
    Json(TestResponse {
        validation: ValidateResponse::check(&payload.formula),
        results,
    })
}

#[derive(Debug, Deserialize)]
struct ConflictRequest {
    /// Draft formula to check against the active rules
    formula: Option<String>,
    /// Rule being edited, left out of the comparison
    exclude_rule_id: Option<Uuid>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ConflictResponse {
    Draft { conflicts: Vec<DraftConflict> },
    Active { conflicts: Vec<RuleConflict> },
}

async fn find_conflicts(
    State(state): State<AppState>,
    Json(payload): Json<ConflictRequest>,
) -> Result<Json<ConflictResponse>, ApiError> {
    let rules = state.store.list_active_rules().await.map_err(store_error)?;

    let response = match payload.formula {
        Some(draft) => {
            if let Err(e) = formula::validate(&draft) {
                return Err((
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "error": format!("Invalid formula: {}", e) })),
                ));
            }
            ConflictResponse::Draft {
                conflicts: formula::conflicts_with(&draft, &rules, payload.exclude_rule_id),
            }
        }
        None => ConflictResponse::Active {
            conflicts: formula::detect_conflicts(&rules, payload.exclude_rule_id),
        },
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_response_reports_reason() {
        assert_eq!(
            ValidateResponse::check("Door AND Window"),
            ValidateResponse {
                valid: true,
                reason: None
            }
        );
        let invalid = ValidateResponse::check("Door AND");
        assert!(!invalid.valid);
        assert_eq!(
            invalid.reason.as_deref(),
            Some("formula ends with a dangling operator")
        );
    }

    #[test]
    fn test_validate_response_serialization() {
        let value = serde_json::to_value(ValidateResponse::check("Door")).unwrap();
        assert_eq!(value, json!({ "valid": true }));
    }

    #[tokio::test]
    async fn test_deeply_nested_formula_is_reported_not_parsed() {
        let formula = "(".repeat(100_000) + "Door" + &")".repeat(100_000);
        let Json(response) = test_formula(Json(TestRequest {
            formula,
            names: vec!["MyDoorFamily".into()],
        }))
        .await;

        assert!(!response.validation.valid);
        assert_eq!(
            response.validation.reason.as_deref(),
            Some("formula nests deeper than 256 levels")
        );
        assert!(response.results.is_empty());
    }
}
