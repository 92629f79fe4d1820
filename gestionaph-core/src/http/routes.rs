//! Route table
//!
//! `dispatch` takes an already-collected request so it can be driven without
//! a socket.

use super::response::{self, action, failure, invalid_data, json_response, not_found, Resp};
use crate::backend::Portal;
use crate::error::ActionResult;
use crate::model::ProjectStatus;
use crate::notifications::{NewNotification, NotificationFilter};
use crate::residents::{NewResident, EXISTING_USER_INFO};
use crate::voting::{NewProject, NewQuote};
use bytes::Bytes;
use hyper::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadAllRequest {
    user_id: String,
}

#[derive(Deserialize)]
struct StatusRequest {
    status: ProjectStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest {
    user_id: String,
    quote_id: String,
}

#[derive(Deserialize)]
struct EnsureProfileRequest {
    email: String,
    #[serde(default)]
    password: String,
}

/// Decode `a=1&b=two%20words` (`+` counts as a space)
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let decode = |raw: &str| {
        let spaced = raw.replace('+', " ");
        urlencoding::decode(&spaced).map(|s| s.into_owned()).unwrap_or(spaced)
    };

    query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Option<T> {
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("Rejected request body: {}", e);
            None
        }
    }
}

fn segment(raw: &str) -> String {
    urlencoding::decode(raw).map(|s| s.into_owned()).unwrap_or_else(|_| raw.to_string())
}

fn filter_from(params: &HashMap<String, String>) -> Result<NotificationFilter, String> {
    let param = |name: &str| params.get(name).map(String::as_str).unwrap_or_default();
    Ok(NotificationFilter::default()
        .with_status(param("status").parse()?)
        .with_audience(param("audience").parse()?)
        .with_search(param("q")))
}

pub async fn dispatch(
    portal: &Portal,
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: Bytes,
) -> Resp {
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    let params = parse_query(query);

    match (method, segments.as_slice()) {
        (&Method::GET, ["health"]) => json_response(StatusCode::OK, &json!({"status": "ok"})),
        (&Method::GET, ["api", "admin-check"]) => admin_check(portal).await,

        (&Method::POST, ["api", "admin", "notifications"]) => create_notification(portal, &body).await,
        (&Method::GET, ["api", "admin", "notifications"]) => list_all_notifications(portal, &params).await,
        (&Method::DELETE, ["api", "admin", "notifications", id]) => {
            delete_notification(portal, &segment(id)).await
        }
        (&Method::GET, ["api", "notifications"]) => list_user_notifications(portal, &params).await,
        (&Method::POST, ["api", "notifications", "read-all"]) => mark_all_read(portal, &body).await,
        (&Method::POST, ["api", "notifications", id, "read"]) => mark_read(portal, &segment(id)).await,

        (&Method::GET, ["api", "projects"]) => list_projects(portal, &params).await,
        (&Method::POST, ["api", "admin", "projects"]) => create_project(portal, &body).await,
        (&Method::POST, ["api", "admin", "projects", id, "quotes"]) => {
            add_quote(portal, &segment(id), &body).await
        }
        (&Method::POST, ["api", "admin", "projects", id, "status"]) => {
            set_status(portal, &segment(id), &body).await
        }
        (&Method::POST, ["api", "projects", id, "votes"]) => submit_vote(portal, &segment(id), &body).await,

        (&Method::POST, ["api", "admin", "residents"]) => create_resident(portal, &body).await,
        (&Method::POST, ["api", "auth", "ensure-profile"]) => ensure_profile(portal, &body).await,

        _ => not_found(),
    }
}

async fn admin_check(portal: &Portal) -> Resp {
    let diagnostics = portal.diagnostics().await;
    let status =
        if diagnostics.is_ok() { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
    json_response(status, &diagnostics)
}

async fn create_notification(portal: &Portal, body: &Bytes) -> Resp {
    let Some(request) = parse_body::<NewNotification>(body) else {
        return invalid_data();
    };
    match portal.notifications().create(request).await {
        Ok(receipt) => json_response(
            StatusCode::OK,
            &json!({"ok": true, "count": receipt.recipients, "ids": receipt.ids}),
        ),
        Err(e) => failure("create notification", &e, "Error creating notification"),
    }
}

async fn list_all_notifications(portal: &Portal, params: &HashMap<String, String>) -> Resp {
    let filter = match filter_from(params) {
        Ok(filter) => filter,
        Err(e) => return response::json_error(StatusCode::BAD_REQUEST, &e),
    };
    match portal.notifications().list_all(&filter).await {
        Ok(rows) => json_response(StatusCode::OK, &json!({"ok": true, "notifications": rows})),
        Err(e) => failure("list notifications", &e, "Error loading notifications"),
    }
}

async fn list_user_notifications(portal: &Portal, params: &HashMap<String, String>) -> Resp {
    let Some(user_id) = params.get("userId").filter(|id| !id.trim().is_empty()) else {
        return response::json_error(StatusCode::BAD_REQUEST, "userId is required");
    };
    let filter = match filter_from(params) {
        Ok(filter) => filter,
        Err(e) => return response::json_error(StatusCode::BAD_REQUEST, &e),
    };

    let service = portal.notifications();
    let listed = futures::try_join!(
        service.list_for_user(user_id, &filter),
        service.unread_count(user_id)
    );
    match listed {
        Ok((notifications, unread)) => json_response(
            StatusCode::OK,
            &json!({"ok": true, "notifications": notifications, "unreadCount": unread}),
        ),
        Err(e) => failure("list user notifications", &e, "Error loading notifications"),
    }
}

async fn delete_notification(portal: &Portal, id: &str) -> Resp {
    match portal.notifications().delete(id).await {
        Ok(()) => action(&ActionResult::ok()),
        Err(e) => failure("delete notification", &e, "Error deleting notification"),
    }
}

async fn mark_read(portal: &Portal, id: &str) -> Resp {
    match portal.notifications().mark_read(id).await {
        Ok(()) => action(&ActionResult::ok()),
        Err(e) => failure("mark notification read", &e, "Error marking notification as read"),
    }
}

async fn mark_all_read(portal: &Portal, body: &Bytes) -> Resp {
    let Some(request) = parse_body::<ReadAllRequest>(body) else {
        return invalid_data();
    };
    match portal.notifications().mark_all_read(&request.user_id).await {
        Ok(count) => action(&ActionResult::ok().with_count(count)),
        Err(e) => failure(
            "mark all notifications read",
            &e,
            "Error marking all notifications as read",
        ),
    }
}

async fn list_projects(portal: &Portal, params: &HashMap<String, String>) -> Resp {
    let viewer = params.get("userId").map(String::as_str).filter(|id| !id.is_empty());
    match portal.voting().list_projects(viewer).await {
        Ok(projects) => json_response(StatusCode::OK, &json!({"ok": true, "projects": projects})),
        Err(e) => failure("list projects", &e, "Error loading projects"),
    }
}

async fn create_project(portal: &Portal, body: &Bytes) -> Resp {
    let Some(request) = parse_body::<NewProject>(body) else {
        return invalid_data();
    };
    match portal.voting().create_project(request).await {
        Ok(id) => action(&ActionResult::ok().with_id(id)),
        Err(e) => failure("create project", &e, "Error creating project"),
    }
}

async fn add_quote(portal: &Portal, project_id: &str, body: &Bytes) -> Resp {
    let Some(request) = parse_body::<NewQuote>(body) else {
        return invalid_data();
    };
    match portal.voting().add_quote(project_id, request).await {
        Ok(id) => action(&ActionResult::ok().with_id(id)),
        Err(e) => failure("add quote", &e, "Error adding quote"),
    }
}

async fn set_status(portal: &Portal, project_id: &str, body: &Bytes) -> Resp {
    let Some(request) = parse_body::<StatusRequest>(body) else {
        return invalid_data();
    };
    match portal.voting().set_status(project_id, request.status).await {
        Ok(()) => action(&ActionResult::ok()),
        Err(e) => failure("change project status", &e, "Error updating project status"),
    }
}

async fn submit_vote(portal: &Portal, project_id: &str, body: &Bytes) -> Resp {
    let Some(request) = parse_body::<VoteRequest>(body) else {
        return invalid_data();
    };
    match portal.voting().submit_vote(project_id, &request.user_id, &request.quote_id).await {
        Ok(id) => action(&ActionResult::ok().with_id(id)),
        Err(e) => failure("submit vote", &e, "Error recording vote"),
    }
}

async fn create_resident(portal: &Portal, body: &Bytes) -> Resp {
    let Some(request) = parse_body::<NewResident>(body) else {
        return invalid_data();
    };
    match portal.residents().create_resident(request).await {
        Ok(registration) => {
            let mut result = ActionResult::ok().with_uid(registration.uid);
            if registration.existed {
                result = result.with_info(EXISTING_USER_INFO);
            }
            action(&result)
        }
        Err(e) => failure("create resident", &e, "Error creating resident"),
    }
}

async fn ensure_profile(portal: &Portal, body: &Bytes) -> Resp {
    let Some(request) = parse_body::<EnsureProfileRequest>(body) else {
        return invalid_data();
    };
    match portal.residents().ensure_profile(&request.email, &request.password).await {
        Ok((uid, role)) => {
            json_response(StatusCode::OK, &json!({"ok": true, "uid": uid, "role": role}))
        }
        Err(e) => failure("ensure profile", &e, "Error signing in"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_decodes() {
        let params = parse_query(Some("userId=u%201&q=gas+leak&status="));
        assert_eq!(params["userId"], "u 1");
        assert_eq!(params["q"], "gas leak");
        assert_eq!(params["status"], "");
        assert!(parse_query(None).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let portal = Portal::in_memory("test");
        let response = dispatch(&portal, &Method::GET, "/api/nope", None, Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_filter_is_400() {
        let portal = Portal::in_memory("test");
        let response = dispatch(
            &portal,
            &Method::GET,
            "/api/admin/notifications",
            Some("audience=everyone"),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
