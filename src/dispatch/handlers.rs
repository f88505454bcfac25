//! Per-path backend handlers.
//!
//! Each handler shapes exactly one backend call. Passthrough handlers forward
//! the request body as-is; the others decode a typed request first and
//! answer 422 when it does not fit.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::backend::{BackendCaller, BackendResponse};
use crate::dispatch::{Handler, HandlerError, HandlerRegistry};
use crate::protocol::Message;

pub const PATH_GET_ABSENCES: &str = "absence/list";
pub const PATH_REGISTER_ABSENCE: &str = "absence/register";
pub const PATH_ABSENCE_TO_SICK_LEAVE: &str = "absence/to-sickleave";
pub const PATH_REGISTER_SICK_LEAVE: &str = "sickleave/register";
pub const PATH_GET_SICK_LEAVES: &str = "sickleave/list";
pub const PATH_GET_TEACHER_COURSES: &str = "courses/teacher";

const ABSENCE_ENDPOINT: &str = "/absence";
const INVALID_ABSENCES_ENDPOINT: &str = "/getinvalidabsenceforperson";
const SELF_CERTIFICATION_ENDPOINT: &str = "/selfcertification";
const SELF_CERTIFICATION_OVERVIEW_ENDPOINT: &str = "/getselfcertificationoverview";
const COURSE_OVERVIEW_ENDPOINT: &str = "/getoverview";

/// Date format the course overview endpoint expects (`ddmmyyyy`).
const COURSE_DATE_FORMAT: &str = "%d%m%Y";

/// Registry with every backend-facing path.
pub fn standard_registry(caller: Arc<BackendCaller>) -> HandlerRegistry {
    HandlerRegistry::new()
        .with(
            PATH_GET_ABSENCES,
            Forward::new(Arc::clone(&caller), Method::GET, INVALID_ABSENCES_ENDPOINT),
        )
        .with(
            PATH_REGISTER_ABSENCE,
            Forward::new(Arc::clone(&caller), Method::POST, ABSENCE_ENDPOINT),
        )
        .with(
            PATH_ABSENCE_TO_SICK_LEAVE,
            Forward::new(Arc::clone(&caller), Method::POST, ABSENCE_ENDPOINT),
        )
        .with(
            PATH_REGISTER_SICK_LEAVE,
            Forward::new(Arc::clone(&caller), Method::POST, SELF_CERTIFICATION_ENDPOINT),
        )
        .with(PATH_GET_SICK_LEAVES, SickLeaveOverview::new(Arc::clone(&caller)))
        .with(PATH_GET_TEACHER_COURSES, TeacherCourses::new(caller))
}

/// Relays the request body to a fixed endpoint.
pub struct Forward {
    caller: Arc<BackendCaller>,
    method: Method,
    endpoint: &'static str,
}

impl Forward {
    pub fn new(caller: Arc<BackendCaller>, method: Method, endpoint: &'static str) -> Self {
        Self {
            caller,
            method,
            endpoint,
        }
    }
}

#[async_trait]
impl Handler for Forward {
    async fn handle(&self, request: &Message) -> Result<Message, HandlerError> {
        let url = self.caller.url(self.endpoint, &[])?;
        let response = self
            .caller
            .call(self.method.clone(), url, Some(request.body.clone()))
            .await?;
        Ok(backend_reply(request, response))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SickLeavesRequest {
    pub visma_id: String,
    pub to_date: String,
}

/// Self-certified sick leaves for one person up to a date.
pub struct SickLeaveOverview {
    caller: Arc<BackendCaller>,
}

impl SickLeaveOverview {
    pub fn new(caller: Arc<BackendCaller>) -> Self {
        Self { caller }
    }
}

#[async_trait]
impl Handler for SickLeaveOverview {
    async fn handle(&self, request: &Message) -> Result<Message, HandlerError> {
        let req: SickLeavesRequest = decode(&request.body)?;
        if req.visma_id.is_empty() || req.to_date.is_empty() {
            return Err(HandlerError::InvalidPayload(
                "vismaId and toDate are required".into(),
            ));
        }

        let url = self.caller.url(
            SELF_CERTIFICATION_OVERVIEW_ENDPOINT,
            &[&req.visma_id, &req.to_date],
        )?;
        let response = self.caller.call(Method::GET, url, None).await?;
        Ok(backend_reply(request, response))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursesRequest {
    pub from_date: DateTime<FixedOffset>,
    pub to_date: DateTime<FixedOffset>,
}

/// A teacher's courses within a date window.
pub struct TeacherCourses {
    caller: Arc<BackendCaller>,
}

impl TeacherCourses {
    pub fn new(caller: Arc<BackendCaller>) -> Self {
        Self { caller }
    }
}

#[async_trait]
impl Handler for TeacherCourses {
    async fn handle(&self, request: &Message) -> Result<Message, HandlerError> {
        let req: CoursesRequest = decode(&request.body)?;
        let from = req.from_date.format(COURSE_DATE_FORMAT).to_string();
        let to = req.to_date.format(COURSE_DATE_FORMAT).to_string();

        let url = self.caller.url(COURSE_OVERVIEW_ENDPOINT, &[&from, &to])?;
        let response = self.caller.call(Method::GET, url, None).await?;
        Ok(backend_reply(request, response))
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, HandlerError> {
    serde_json::from_slice(body).map_err(|e| HandlerError::InvalidPayload(e.to_string()))
}

fn backend_reply(request: &Message, response: BackendResponse) -> Message {
    Message::reply(&request.msg_id, i32::from(response.status), response.body)
        .with_header("path", &request.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // Nothing listens on the discard port.
    fn unreachable_caller() -> Arc<BackendCaller> {
        Arc::new(BackendCaller::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap())
    }

    #[test]
    fn standard_registry_covers_all_paths() {
        let registry = standard_registry(unreachable_caller());
        assert_eq!(
            registry.paths(),
            vec![
                PATH_GET_ABSENCES,
                PATH_REGISTER_ABSENCE,
                PATH_ABSENCE_TO_SICK_LEAVE,
                PATH_GET_TEACHER_COURSES,
                PATH_GET_SICK_LEAVES,
                PATH_REGISTER_SICK_LEAVE,
            ]
        );
    }

    #[tokio::test]
    async fn sick_leaves_rejects_malformed_body() {
        let handler = SickLeaveOverview::new(unreachable_caller());
        let err = handler
            .handle(&Message::request("m1", PATH_GET_SICK_LEAVES, b"not json".to_vec()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 422);
    }

    #[tokio::test]
    async fn sick_leaves_requires_fields() {
        let handler = SickLeaveOverview::new(unreachable_caller());
        let body = br#"{"vismaId":"","toDate":"2024-01-31"}"#.to_vec();
        let err = handler
            .handle(&Message::request("m1", PATH_GET_SICK_LEAVES, body))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 422);
        assert!(err.to_string().contains("vismaId"));
    }

    #[tokio::test]
    async fn courses_rejects_bad_dates() {
        let handler = TeacherCourses::new(unreachable_caller());
        let body = br#"{"fromDate":"yesterday","toDate":"2024-01-31T00:00:00Z"}"#.to_vec();
        let err = handler
            .handle(&Message::request("m1", PATH_GET_TEACHER_COURSES, body))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn transport_failure_maps_to_500() {
        let handler = Forward::new(unreachable_caller(), Method::POST, ABSENCE_ENDPOINT);
        let err = handler
            .handle(&Message::request("m1", PATH_REGISTER_ABSENCE, b"{}".to_vec()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn course_dates_use_day_month_year() {
        let req: CoursesRequest = serde_json::from_str(
            r#"{"fromDate":"2024-03-05T08:00:00+01:00","toDate":"2024-12-24T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(req.from_date.format(COURSE_DATE_FORMAT).to_string(), "05032024");
        assert_eq!(req.to_date.format(COURSE_DATE_FORMAT).to_string(), "24122024");
    }
}
