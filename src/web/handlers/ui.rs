use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use minijinja::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::web::state::AppState;
use crate::web::static_files::get_embedded_file;
use crate::web::templates::render_template;

// Landing page
pub async fn index_handler() -> impl IntoResponse {
    match get_embedded_file("index.html") {
        Some(content) => Html(content).into_response(),
        None => Html(
            "<html><body><h1>InsightBot</h1><p>Error: index.html not found</p></body></html>",
        )
        .into_response(),
    }
}

pub async fn not_found_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut context = HashMap::new();
    context.insert("title", Value::from("Page not found"));
    context.insert(
        "message",
        Value::from("The page you were looking for does not exist."),
    );
    (
        StatusCode::NOT_FOUND,
        Html(render_template(&state.template_env, "error.html", context)),
    )
}

// Query console, bootstrapped with the current session state
pub async fn console_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let profile = state.connections.current().ok().flatten();
    let session = state.console.tabs_view().await;

    let mut context = HashMap::new();
    context.insert("connected", Value::from(profile.is_some()));
    context.insert(
        "database",
        Value::from(profile.map(|p| p.database).unwrap_or_default()),
    );
    context.insert("session", Value::from_serialize(&session));

    Html(render_template(&state.template_env, "console.html", context))
}
