use crate::api::GradebookSource;
use crate::error::ApiError;
use crate::models::{CourseSection, Grade, SetGradeRequest};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

const SET_GRADE_PATH: &str = "/api/set_grade/";

#[derive(Clone)]
pub struct SisClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl SisClient {
    pub fn new(base_url: String, token: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .connect_timeout(std::time::Duration::from_secs(15))
            .default_headers(build_headers(token.as_deref())?)
            .build()?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn section_url(&self, section_id: &str) -> String {
        self.url(&format!("/api/sections/{}/", section_id))
    }

    fn grades_url(&self, section_id: &str) -> String {
        self.url(&format!(
            "/api/grades/?enrollment__course_section={}",
            section_id
        ))
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        read_json(url, response).await
    }

    pub async fn get_course_section(&self, section_id: &str) -> Result<CourseSection, ApiError> {
        self.get(self.section_url(section_id)).await
    }

    pub async fn list_grades(&self, section_id: &str) -> Result<Vec<Grade>, ApiError> {
        self.get(self.grades_url(section_id)).await
    }

    pub async fn post_set_grade(
        &self,
        request: &SetGradeRequest,
    ) -> Result<serde_json::Value, ApiError> {
        let url = self.url(SET_GRADE_PATH);
        debug!(%url, student = request.student, marking_period = %request.marking_period, "POST");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        read_json(url, response).await
    }
}

impl GradebookSource for SisClient {
    async fn course_section(&self, section_id: &str) -> Result<CourseSection, ApiError> {
        self.get_course_section(section_id).await
    }

    async fn grades(&self, section_id: &str) -> Result<Vec<Grade>, ApiError> {
        self.list_grades(section_id).await
    }

    async fn set_grade(&self, request: &SetGradeRequest) -> Result<serde_json::Value, ApiError> {
        self.post_set_grade(request).await
    }
}

fn build_headers(token: Option<&str>) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Token {}", token))?,
        );
    }
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static("gradebook-grid"));
    Ok(headers)
}

async fn read_json<T: DeserializeOwned>(
    url: String,
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();

    // Get the response text for both error and success cases
    let response_text = response.text().await.map_err(|source| ApiError::Request {
        url: url.clone(),
        source,
    })?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status,
            url,
            body: response_text,
        });
    }

    // An empty 2xx body still counts as success
    let body = if response_text.trim().is_empty() {
        "null"
    } else {
        response_text.as_str()
    };

    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        excerpt: response_text.chars().take(500).collect(),
        url,
        source,
    })
}
