use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    header::HeaderValue,
    multipart::{Form, Part},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    domain::{
        AckResponse, ActivitiesResponse, Activity, ActivityDetails, ActivityUpdate, Allocation,
        AllocationsResponse, ApprovalRecord, Budget, BudgetsResponse, CreateBudgetRequest,
        Engineer, EngineersResponse, FinalizeRequest, LoginRequest, LoginResponse, NewActivity,
        OwnActivitiesResponse, UpdateBudgetRequest,
    },
    roles::Role,
    ApiUrl, BudgetBackend, CredentialStore,
};

const TOKEN_HEADER: &str = "token";
const GENERIC_FAILURE: &str = "Request failed. Please try again.";
const UNAUTHORIZED_MESSAGE: &str = "Session expired or invalid. Log in again.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("ServerError ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Rejected: {message}")]
    Rejected { message: String },
    #[error("RequestError: {0}")]
    Request(String),
    #[error("ParsingError: {0}")]
    Parsing(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl ApiError {
    /// Text fit for showing to a user: the server's own message when it sent
    /// one, a generic line otherwise.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { message, .. } | ApiError::Rejected { message }
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            ApiError::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
            ApiError::Unsupported(message) => message.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Request(e.to_string())
    }
}

/// Fails when a response envelope carries `success: false`.
fn ensure_success(success: Option<bool>, message: Option<String>) -> Result<(), ApiError> {
    match success {
        Some(false) => Err(ApiError::Rejected {
            message: message.unwrap_or_default(),
        }),
        _ => Ok(()),
    }
}

/// Some endpoints answer with an empty body or plain text.
async fn read_ack(response: Response) -> Result<(), ApiError> {
    let bytes = response.bytes().await?;
    let ack = serde_json::from_slice::<AckResponse>(&bytes).unwrap_or_default();
    ensure_success(ack.success, ack.message)
}

fn activity_form(activity: &NewActivity) -> Form {
    let form = activity
        .form_fields()
        .into_iter()
        .fold(Form::new(), |form, (name, value)| form.text(name, value));
    activity.images.iter().fold(form, |form, image| {
        form.part(
            "images",
            Part::bytes(image.bytes.clone()).file_name(image.file_name.clone()),
        )
    })
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: ApiUrl,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpBackend {
    pub fn new(base_url: ApiUrl, credentials: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ApiError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &ApiUrl {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.base_url.append_path(path);
        let mut builder = self.client.request(method, url.as_ref());

        if let Some(token) = self.credentials.token() {
            if let Ok(value) = HeaderValue::from_str(&token) {
                builder = builder.header(TOKEN_HEADER, value);
            }
        }

        builder
    }

    async fn send(&self, request: RequestBuilder, call_name: &str) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Request(format!("Failed to call {}: {}", call_name, e)))?;

        let status = response.status();
        debug!(call = call_name, status = status.as_u16(), "response received");

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = serde_json::from_slice::<AckResponse>(&body)
                .ok()
                .and_then(|ack| ack.message)
                .unwrap_or_else(|| format!("{} returned {}", call_name, status));
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        call_name: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path), call_name).await?;
        response.json::<T>().await.map_err(|e| {
            ApiError::Parsing(format!("Failed to parse {} response: {}", call_name, e))
        })
    }

    /// Sends a JSON body and checks the `{success, message}` envelope, if any.
    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        call_name: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .send(self.request(method, path).json(body), call_name)
            .await?;
        read_ack(response).await
    }

    /// Logs in through the role's login endpoint and returns the session token.
    #[instrument(name = "HttpBackend::login", skip(self, password))]
    pub async fn login(&self, role: Role, email: &str, password: &str) -> Result<String, ApiError> {
        let profile = role.profile();
        let Some(path) = profile.login_path else {
            return Err(ApiError::Unsupported(format!(
                "{} has no server login; supply a token instead",
                profile.title
            )));
        };

        let call_name = format!("POST {}", path);
        let response = self
            .send(
                self.request(Method::POST, path)
                    .json(&LoginRequest { email, password }),
                &call_name,
            )
            .await?;
        let login: LoginResponse = response.json().await.map_err(|e| {
            ApiError::Parsing(format!("Failed to parse {} response: {}", call_name, e))
        })?;

        ensure_success(login.success, login.message.clone())?;
        login.token.ok_or_else(|| {
            ApiError::Parsing(format!("{} response did not contain a token", call_name))
        })
    }
}

#[async_trait]
impl BudgetBackend for HttpBackend {
    async fn budgets(&self) -> Result<Vec<Budget>, ApiError> {
        let response: BudgetsResponse = self.get_json("budgets/get", "GET budgets/get").await?;
        Ok(response.budgets)
    }

    async fn create_budget(&self, amount: f64) -> Result<(), ApiError> {
        self.send_json(
            Method::POST,
            "budgets/add",
            &CreateBudgetRequest { budget: amount },
            "POST budgets/add",
        )
        .await
    }

    async fn update_budget(&self, id: i64, amount: f64) -> Result<(), ApiError> {
        self.send_json(
            Method::PUT,
            "budgets/update",
            &UpdateBudgetRequest { id, budget: amount },
            "PUT budgets/update",
        )
        .await
    }

    async fn activities(&self) -> Result<Vec<Activity>, ApiError> {
        let response: ActivitiesResponse = self
            .get_json("update_activity/get", "GET update_activity/get")
            .await?;
        ensure_success(response.success, response.message)?;
        Ok(response.activities)
    }

    async fn assigned_activities(&self) -> Result<Vec<Activity>, ApiError> {
        let response: ActivitiesResponse = self
            .get_json("update_activity/get_id", "GET update_activity/get_id")
            .await?;
        ensure_success(response.success, response.message)?;
        Ok(response.activities)
    }

    async fn managed_activities(&self) -> Result<Vec<Activity>, ApiError> {
        let response: ActivitiesResponse =
            self.get_json("activity/get", "GET activity/get").await?;
        ensure_success(response.success, response.message)?;
        Ok(response.activities)
    }

    async fn own_activities(&self) -> Result<Vec<Activity>, ApiError> {
        let response: OwnActivitiesResponse = self
            .get_json("activity/get_all_id", "GET activity/get_all_id")
            .await?;
        ensure_success(response.success, response.message)?;
        Ok(response.data)
    }

    async fn engineers(&self) -> Result<Vec<Engineer>, ApiError> {
        let response: EngineersResponse = self.get_json("engineers", "GET engineers").await?;
        ensure_success(response.success, response.message)?;
        Ok(response.engineers)
    }

    #[instrument(name = "HttpBackend::add_activity", skip_all, fields(images = activity.images.len()))]
    async fn add_activity(&self, activity: &NewActivity) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "activity/add")
            .multipart(activity_form(activity));
        let response = self.send(request, "POST activity/add").await?;
        read_ack(response).await
    }

    async fn update_assigned_activity(&self, update: &ActivityUpdate) -> Result<(), ApiError> {
        self.send_json(
            Method::PUT,
            "activity/update_id",
            update,
            "PUT activity/update_id",
        )
        .await
    }

    async fn set_activity_details(&self, details: &ActivityDetails) -> Result<(), ApiError> {
        self.send_json(
            Method::POST,
            "update_activity/details",
            details,
            "POST update_activity/details",
        )
        .await
    }

    async fn finalize(&self, request: &FinalizeRequest) -> Result<(), ApiError> {
        self.send_json(
            Method::POST,
            "budgets/finalize",
            request,
            "POST budgets/finalize",
        )
        .await
    }

    async fn allocations(&self) -> Result<Vec<Allocation>, ApiError> {
        let response: AllocationsResponse =
            self.get_json("budgets/get_all", "GET budgets/get_all").await?;
        ensure_success(response.success, response.message)?;
        Ok(response.allocations)
    }

    async fn update_activity(&self, update: &ActivityUpdate) -> Result<(), ApiError> {
        self.send_json(Method::PUT, "activity/update", update, "PUT activity/update")
            .await
    }

    async fn record_approval(&self, record: &ApprovalRecord) -> Result<(), ApiError> {
        self.send_json(Method::POST, "pd-approvals", record, "POST pd-approvals")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefers_server_text() {
        let err = ApiError::Server {
            status: 400,
            message: "Budget exceeds ceiling".to_string(),
        };
        assert_eq!(err.user_message(), "Budget exceeds ceiling");

        let err = ApiError::Rejected {
            message: "  ".to_string(),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE);

        let err = ApiError::Request("connection refused".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn envelope_with_success_false_is_rejected() {
        assert!(ensure_success(None, None).is_ok());
        assert!(ensure_success(Some(true), None).is_ok());

        let err = ensure_success(Some(false), Some("nope".to_string())).unwrap_err();
        assert!(matches!(err, ApiError::Rejected { message } if message == "nope"));
    }
}
