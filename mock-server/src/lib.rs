use std::time::Duration;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

/// How long `/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_secs(3);

/// A university record in the wire format of the public search API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct University {
    pub name: String,
    pub country: String,
    pub alpha_two_code: String,
    pub domains: Vec<String>,
    pub web_pages: Vec<String>,
    #[serde(rename = "state-province")]
    pub state_province: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub name: String,
}

fn university(
    name: &str,
    country: &str,
    alpha_two_code: &str,
    domain: &str,
    state_province: Option<&str>,
) -> University {
    University {
        name: name.to_string(),
        country: country.to_string(),
        alpha_two_code: alpha_two_code.to_string(),
        domains: vec![domain.to_string()],
        web_pages: vec![format!("http://www.{domain}/")],
        state_province: state_province.map(str::to_string),
    }
}

/// The fixed dataset served by `/search`.
pub fn dataset() -> Vec<University> {
    vec![
        university("Chungwoon University", "Korea, Republic of", "KR", "chungwoon.ac.kr", None),
        university(
            "Universidad de Monterrey",
            "Mexico",
            "MX",
            "udem.edu.mx",
            Some("Nuevo Leon"),
        ),
        university(
            "San Jose State University",
            "United States",
            "US",
            "sjsu.edu",
            Some("California"),
        ),
        university(
            "Universidad de San Andres",
            "Argentina",
            "AR",
            "udesa.edu.ar",
            None,
        ),
        university("Middlesex University", "United Kingdom", "GB", "mdx.ac.uk", None),
    ]
}

pub fn app() -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/status/{code}", get(status))
        .route("/malformed", get(malformed))
        .route("/slow", get(slow))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn search(Query(params): Query<SearchParams>) -> Json<Vec<University>> {
    let needle = params.name.to_lowercase();
    let matches: Vec<University> = dataset()
        .into_iter()
        .filter(|u| u.name.to_lowercase().contains(&needle))
        .collect();
    debug!(query = %params.name, matches = matches.len(), "search");
    Json(matches)
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, &'static str), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, "[]"))
}

async fn malformed() -> &'static str {
    "this is not json"
}

async fn slow() -> Json<Vec<University>> {
    tokio::time::sleep(SLOW_DELAY).await;
    Json(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn university_serializes_wire_field_names() {
        let json = serde_json::to_value(university("A", "B", "C", "a.edu", None)).unwrap();
        assert_eq!(json["alpha_two_code"], "C");
        assert_eq!(json["web_pages"][0], "http://www.a.edu/");
        assert!(json["state-province"].is_null());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn dataset_names_are_unique() {
        let data = dataset();
        let mut names: Vec<_> = data.iter().map(|u| u.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), data.len());
    }

    #[test]
    fn search_params_default_to_empty_name() {
        let params: SearchParams = serde_json::from_str("{}").unwrap();
        assert!(params.name.is_empty());
    }
}
