use anyhow::{Context, anyhow};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::task::{Comment, Dashboard, NotificationFlags, Task, TaskPayload, User};

#[derive(Debug)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    tasks: Option<Vec<Task>>,
}

#[derive(Debug, Deserialize)]
struct DashboardResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    dashboard: Option<Dashboard>,
}

#[derive(Debug, Deserialize)]
struct CommentsResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    comments: Option<Vec<Comment>>,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, serde::Serialize)]
struct RegisterBody<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, serde::Serialize)]
struct CommentBody<'a> {
    content: &'a str,
}

#[derive(Debug, serde::Serialize)]
struct ProfileBody<'a> {
    username: &'a str,
    email: &'a str,
}

#[derive(Debug, serde::Serialize)]
struct PreferencesBody<'a> {
    notifications: &'a NotificationFlags,
}

impl ApiClient {
    pub fn new(base_url: String, token: Option<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .build()
            .context("failed to construct http client")?;
        Ok(Self {
            base_url,
            token,
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    #[instrument(skip(self, request))]
    fn execute<T: DeserializeOwned>(
        &self,
        op: &'static str,
        request: RequestBuilder,
    ) -> anyhow::Result<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .with_context(|| format!("cannot reach server at {}", self.base_url))?;

        let status = response.status();
        debug!(op, http_status = %status, "received response");

        response
            .json::<T>()
            .with_context(|| format!("{op}: malformed response from server (http {status})"))
    }

    #[instrument(skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> anyhow::Result<(String, User)> {
        let body = LoginBody { email, password };
        let response: AuthResponse = self.execute(
            "login",
            self.http.post(self.url("/auth/login")).json(&body),
        )?;
        unwrap_auth(response, "Login failed")
    }

    #[instrument(skip(self, password))]
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> anyhow::Result<(String, User)> {
        let body = RegisterBody {
            username,
            email,
            password,
        };
        let response: AuthResponse = self.execute(
            "register",
            self.http.post(self.url("/auth/register")).json(&body),
        )?;
        unwrap_auth(response, "Registration failed")
    }

    #[instrument(skip(self))]
    pub fn dashboard(&self) -> anyhow::Result<Dashboard> {
        let response: DashboardResponse =
            self.execute("dashboard", self.http.get(self.url("/dashboard")))?;
        ensure_success(response.success, response.message, "Could not load dashboard")?;
        response
            .dashboard
            .ok_or_else(|| anyhow!("dashboard: response missing dashboard payload"))
    }

    #[instrument(skip(self))]
    pub fn tasks(&self) -> anyhow::Result<Vec<Task>> {
        let response: TasksResponse = self.execute("tasks", self.http.get(self.url("/tasks")))?;
        ensure_success(response.success, response.message, "Could not load tasks")?;
        response
            .tasks
            .ok_or_else(|| anyhow!("tasks: response missing task list"))
    }

    #[instrument(skip(self, payload))]
    pub fn create_task(&self, payload: &TaskPayload) -> anyhow::Result<()> {
        let response: AckResponse =
            self.execute("create task", self.http.post(self.url("/tasks")).json(payload))?;
        ensure_success(response.success, response.message, "Operation failed")
    }

    #[instrument(skip(self, payload))]
    pub fn update_task(&self, id: &str, payload: &TaskPayload) -> anyhow::Result<()> {
        let response: AckResponse = self.execute(
            "update task",
            self.http
                .put(self.url(&format!("/tasks/{id}")))
                .json(payload),
        )?;
        ensure_success(response.success, response.message, "Operation failed")
    }

    #[instrument(skip(self))]
    pub fn delete_task(&self, id: &str) -> anyhow::Result<()> {
        let response: AckResponse = self.execute(
            "delete task",
            self.http.delete(self.url(&format!("/tasks/{id}"))),
        )?;
        ensure_success(response.success, response.message, "Operation failed")
    }

    #[instrument(skip(self))]
    pub fn comments(&self, task_id: &str) -> anyhow::Result<Vec<Comment>> {
        let response: CommentsResponse = self.execute(
            "comments",
            self.http.get(self.url(&format!("/comments/{task_id}"))),
        )?;
        ensure_success(response.success, response.message, "Could not load comments")?;
        Ok(response.comments.unwrap_or_default())
    }

    #[instrument(skip(self, content))]
    pub fn add_comment(&self, task_id: &str, content: &str) -> anyhow::Result<()> {
        let body = CommentBody { content };
        let response: AckResponse = self.execute(
            "add comment",
            self.http
                .post(self.url(&format!("/comments/{task_id}")))
                .json(&body),
        )?;
        ensure_success(response.success, response.message, "Operation failed")
    }

    #[instrument(skip(self))]
    pub fn profile(&self) -> anyhow::Result<User> {
        let response: ProfileResponse =
            self.execute("profile", self.http.get(self.url("/users/profile")))?;
        ensure_success(response.success, response.message, "Could not load profile")?;
        response
            .user
            .ok_or_else(|| anyhow!("profile: response missing user payload"))
    }

    #[instrument(skip(self))]
    pub fn update_profile(&self, username: &str, email: &str) -> anyhow::Result<User> {
        let body = ProfileBody { username, email };
        let response: ProfileResponse = self.execute(
            "update profile",
            self.http.put(self.url("/users/profile")).json(&body),
        )?;
        ensure_success(response.success, response.message, "Update failed")?;
        response
            .user
            .ok_or_else(|| anyhow!("update profile: response missing user payload"))
    }

    #[instrument(skip(self, notifications))]
    pub fn update_preferences(&self, notifications: &NotificationFlags) -> anyhow::Result<()> {
        let body = PreferencesBody { notifications };
        let response: AckResponse = self.execute(
            "update preferences",
            self.http.put(self.url("/users/preferences")).json(&body),
        )?;
        ensure_success(response.success, response.message, "Update failed")
    }
}

fn ensure_success(
    success: bool,
    message: Option<String>,
    fallback: &'static str,
) -> anyhow::Result<()> {
    if success {
        return Ok(());
    }

    let reason = message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    Err(anyhow!("{reason}"))
}

fn unwrap_auth(response: AuthResponse, fallback: &'static str) -> anyhow::Result<(String, User)> {
    ensure_success(response.success, response.message, fallback)?;

    let token = response
        .token
        .ok_or_else(|| anyhow!("auth: response missing token"))?;
    let user = response
        .user
        .ok_or_else(|| anyhow!("auth: response missing user"))?;
    Ok((token, user))
}

#[cfg(test)]
mod tests {
    use super::{AckResponse, AuthResponse, ensure_success, unwrap_auth};

    #[test]
    fn success_envelope_yields_payload() {
        let response: AuthResponse = serde_json::from_str(
            r#"{
                "success": true,
                "token": "abc.def.ghi",
                "user": {"username": "ada", "email": "ada@example.net"}
            }"#,
        )
        .expect("auth json");

        let (token, user) = unwrap_auth(response, "Login failed").expect("auth payload");
        assert_eq!(token, "abc.def.ghi");
        assert_eq!(user.username, "ada");
    }

    #[test]
    fn failure_envelope_surfaces_server_message() {
        let response: AckResponse =
            serde_json::from_str(r#"{"success": false, "message": "Invalid credentials"}"#)
                .expect("ack json");

        let err = ensure_success(response.success, response.message, "Operation failed")
            .expect_err("should fail");
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[test]
    fn failure_envelope_without_message_uses_fallback() {
        let response: AckResponse =
            serde_json::from_str(r#"{"success": false}"#).expect("ack json");

        let err = ensure_success(response.success, response.message, "Operation failed")
            .expect_err("should fail");
        assert_eq!(err.to_string(), "Operation failed");
    }
}
