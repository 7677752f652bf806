use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::server::ServeState;

pub(super) fn router() -> Router<ServeState> {
    Router::new().route("/providers", get(list_handler))
}

#[derive(Debug, Serialize)]
pub(crate) struct ProviderInfo {
    pub name: String,
    pub display_name: String,
    pub url: String,
    pub supported: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProviderList {
    pub providers: Vec<ProviderInfo>,
}

async fn list_handler(State(state): State<ServeState>) -> Json<ProviderList> {
    let providers = state
        .context
        .catalog()
        .profiles()
        .map(|profile| ProviderInfo {
            name: profile.id.clone(),
            display_name: profile.display_name().to_string(),
            url: profile.home_url.clone(),
            supported: true,
        })
        .collect();
    Json(ProviderList { providers })
}
