//! Entity endpoints
//!
//! Per kind: `POST /api/<kind>s`, `GET /api/<kind>s`, `GET /api/<kind>s/:id`.
//! Courses additionally accept `PUT` and `DELETE` on `/api/courses/:id`.

use admin_common::store::{Direction, Filter, RecordQuery};
use admin_common::{time, Kind};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::ApiError;
use crate::pagination::calculate_pagination;
use crate::{pipeline, AppState};

/// Query parameters accepted by list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Case-insensitive substring over the kind's two search fields
    pub search: Option<String>,
    pub order_by: Option<String>,
    /// "asc" or "desc"
    pub order_direction: Option<String>,
    pub subject: Option<String>,
    pub level: Option<String>,
    pub category: Option<String>,
    pub published: Option<String>,
    pub featured: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl ListParams {
    /// Translate request parameters into a store query
    pub fn to_query(&self) -> Result<RecordQuery, ApiError> {
        let page = calculate_pagination(self.limit, self.offset);
        let mut query = RecordQuery::new().limit(page.limit).offset(page.offset);

        let exact = [
            ("subject", &self.subject),
            ("level", &self.level),
            ("category", &self.category),
            ("is_published", &self.published),
            ("is_featured", &self.featured),
        ];
        for (field, value) in exact {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                query = query.filter(Filter::eq(field, value));
            }
        }
        if let Some(min) = self.min_price {
            query = query.filter(Filter::gte("price", min));
        }
        if let Some(max) = self.max_price {
            query = query.filter(Filter::lte("price", max));
        }
        if let Some(term) = &self.search {
            query = query.search(term.clone());
        }

        if self.order_by.is_some() || self.order_direction.is_some() {
            let direction = match &self.order_direction {
                Some(d) => d.parse::<Direction>()?,
                None => Direction::Desc,
            };
            let field = self.order_by.as_deref().unwrap_or("created_at");
            query = query.order_by(field, direction);
        }
        Ok(query)
    }
}

/// Build entity routes for every kind
pub fn record_routes() -> Router<AppState> {
    let mut router = Router::new();
    for kind in Kind::ALL {
        let collection = get(
            move |state: State<AppState>, params: Result<Query<ListParams>, QueryRejection>| {
                list_records(state, kind, params)
            },
        )
        .post(
            move |state: State<AppState>, body: Result<Json<Value>, JsonRejection>| {
                create_record(state, kind, body)
            },
        );

        let mut item = get(move |state: State<AppState>, id: Path<String>| {
            get_record(state, kind, id)
        });
        if kind == Kind::Course {
            item = item.put(update_course).delete(delete_course);
        }

        router = router
            .route(&format!("/api/{}", kind.collection()), collection)
            .route(&format!("/api/{}/:id", kind.collection()), item);
    }
    router
}

/// POST /api/<kind>s
async fn create_record(
    State(state): State<AppState>,
    kind: Kind,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let fields = object_body(body)?;
    let stored = pipeline::create(&state, kind, &fields).await?;

    let label = stored.label(kind).unwrap_or_default().to_string();
    let mut response = json!({
        "success": true,
        "id": stored.id(),
        "created_at": stored.get("created_at"),
        "message": format!("{} '{}' created successfully", noun(kind), label),
        "timestamp": time::now_string(),
    });
    response[kind.label_field()] = Value::String(label);
    response["data"] = stored.into();
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/<kind>s
async fn list_records(
    State(state): State<AppState>,
    kind: Kind,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let query = params.to_query()?;
    let items = state.store.query(kind, &query).await?;

    Ok(Json(json!({
        "success": true,
        "count": items.len(),
        "items": items,
        "limit": query.limit,
        "offset": query.offset,
        "timestamp": time::now_string(),
    })))
}

/// GET /api/<kind>s/:id
async fn get_record(
    State(state): State<AppState>,
    kind: Kind,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state.store.get(kind, &id).await?;
    Ok(Json(json!({ "success": true, "data": record })))
}

/// PUT /api/courses/:id
async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let fields = object_body(body)?;
    let (ack, changes) = pipeline::update_course(&state, &id, &fields).await?;

    let updated_fields: Vec<&String> = changes.iter().map(|(name, _)| name).collect();
    Ok(Json(json!({
        "success": true,
        "id": ack.id,
        "updated_fields": updated_fields,
        "message": "Course updated successfully",
        "timestamp": time::now_string(),
    })))
}

/// DELETE /api/courses/:id
async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ack = pipeline::delete_course(&state, &id).await?;
    Ok(Json(json!({
        "success": true,
        "id": ack.id,
        "message": "Course deleted successfully",
        "timestamp": time::now_string(),
    })))
}

fn object_body(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    match body {
        Ok(Json(Value::Object(fields))) => Ok(fields),
        Ok(Json(_)) => Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
        Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
    }
}

fn noun(kind: Kind) -> &'static str {
    match kind {
        Kind::Blog => "Blog post",
        Kind::Course => "Course",
        Kind::Testimonial => "Testimonial",
        Kind::Job => "Job",
    }
}
