//! Implements `Repository` and `AuthApi` over HTTP using `reqwest`.

use crate::api::{AuthApi, Credentials, Registration, Repository, Token};
use crate::error::{ApiError, ApiResult};
use crate::model::{Transaction, TransactionDraft, TransactionId};
use crate::Result;
use anyhow::Context;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const SIGN_UP: &str = "api/auth/signup";
const SIGN_IN: &str = "api/auth/signin";
const SPENDINGS: &str = "api/spendings/";
const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// Talks to the spending service at `base_url`. Cloning is cheap; clones share one connection
/// pool.
#[derive(Debug, Clone)]
pub(crate) struct HttpRemote {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRemote {
    pub(crate) fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Unable to create the HTTP client")?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Unknown(format!("Unable to build the URL for '{path}': {e}")))
    }

    fn transaction_endpoint(&self, id: &TransactionId) -> ApiResult<Url> {
        let mut url = self.endpoint(SPENDINGS)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Unknown(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .push(id.as_str());
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    token: String,
}

#[async_trait::async_trait]
impl Repository for HttpRemote {
    async fn list(&self, token: &Token) -> ApiResult<Vec<Transaction>> {
        let url = self.endpoint(SPENDINGS)?;
        trace!("GET {url}");
        let response = self
            .client
            .get(url)
            .bearer_auth(token.as_str())
            .send()
            .await?;
        let transactions: Vec<Transaction> = check(response, None).await?.json().await?;
        debug!("Fetched {} transactions", transactions.len());
        Ok(transactions)
    }

    async fn create(&self, token: &Token, draft: &TransactionDraft) -> ApiResult<Transaction> {
        let url = self.endpoint(SPENDINGS)?;
        trace!("POST {url}");
        let response = self
            .client
            .post(url)
            .bearer_auth(token.as_str())
            .header(IDEMPOTENCY_KEY, draft.submission_key().to_string())
            .json(draft)
            .send()
            .await?;
        let body = check(response, None).await?.text().await?;

        if let Ok(created) = serde_json::from_str::<Transaction>(&body) {
            return Ok(created);
        }

        // Some versions of the service answer with a confirmation message instead of the record.
        // The newest listed transaction that matches the draft is the one just created.
        debug!("The service did not return the created transaction ({body}), looking it up");
        self.list(token)
            .await?
            .into_iter()
            .rev()
            .find(|transaction| draft.matches(transaction))
            .ok_or_else(|| {
                ApiError::Unknown("The created transaction is missing from the listing".into())
            })
    }

    async fn delete(&self, token: &Token, id: &TransactionId) -> ApiResult<()> {
        let url = self.transaction_endpoint(id)?;
        trace!("DELETE {url}");
        let response = self
            .client
            .delete(url)
            .bearer_auth(token.as_str())
            .send()
            .await?;
        check(response, Some(id)).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpRemote {
    async fn sign_up(&self, registration: &Registration) -> ApiResult<()> {
        let url = self.endpoint(SIGN_UP)?;
        trace!("POST {url}");
        let response = self.client.post(url).json(registration).send().await?;
        check(response, None).await?;
        Ok(())
    }

    async fn sign_in(&self, credentials: &Credentials) -> ApiResult<Token> {
        let url = self.endpoint(SIGN_IN)?;
        trace!("POST {url}");
        let response = self.client.post(url).json(credentials).send().await?;
        let body: SignInResponse = check(response, None).await?.json().await?;
        let token = Token::new(body.token);
        if token.is_empty() {
            return Err(ApiError::Unknown("The service returned an empty token".into()));
        }
        Ok(token)
    }
}

/// Passes successful responses through and classifies the rest.
async fn check(response: Response, id: Option<&TransactionId>) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    debug!("The service responded with {status}: {body}");

    Err(match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::Validation(if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => match id {
            Some(id) => ApiError::NotFound(id.clone()),
            None => ApiError::Unknown(format!("{status}: {body}")),
        },
        _ => ApiError::Unknown(format!("{status}: {body}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Category};
    use chrono::NaiveDate;
    use mockito::Matcher;
    use std::str::FromStr;

    const LISTING: &str = r#"[
        {"id": 1, "amount": 50.0, "description": "Groceries", "category": "FOOD", "date": "2024-01-10"},
        {"id": 2, "amount": 20.0, "description": "Bus", "category": "TRANSPORT", "date": "2024-01-20"}
    ]"#;

    fn remote(server: &mockito::ServerGuard) -> HttpRemote {
        let base = Url::parse(&format!("{}/", server.url())).unwrap();
        HttpRemote::new(base, Duration::from_secs(5)).unwrap()
    }

    fn token() -> Token {
        Token::new("abc")
    }

    fn draft() -> TransactionDraft {
        TransactionDraft::new(
            Amount::from_str("12.5").unwrap(),
            "Lunch",
            Category::Food,
            NaiveDate::from_str("2024-03-01").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_list_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/spendings/")
            .match_header("authorization", "Bearer abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(LISTING)
            .create_async()
            .await;

        let transactions = remote(&server).list(&token()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[1].category(), Category::Transport);
    }

    #[tokio::test]
    async fn test_list_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/spendings/")
            .with_status(401)
            .with_body("User not authenticated")
            .create_async()
            .await;

        let result = remote(&server).list(&token()).await;
        assert_eq!(result, Err(ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_list_garbage_body_is_unknown() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/spendings/")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let result = remote(&server).list(&token()).await;
        assert!(matches!(result, Err(ApiError::Unknown(_))), "{result:?}");
    }

    #[tokio::test]
    async fn test_list_network_error() {
        // Nothing listens on port 9 (discard) on a test machine.
        let base = Url::parse("http://127.0.0.1:9/").unwrap();
        let remote = HttpRemote::new(base, Duration::from_secs(2)).unwrap();
        let result = remote.list(&token()).await;
        assert!(matches!(result, Err(ApiError::Network(_))), "{result:?}");
    }

    #[tokio::test]
    async fn test_create_returns_echoed_record() {
        let mut server = mockito::Server::new_async().await;
        let draft = draft();
        let mock = server
            .mock("POST", "/api/spendings/")
            .match_header("authorization", "Bearer abc")
            .match_header(
                "idempotency-key",
                draft.submission_key().to_string().as_str(),
            )
            .match_body(Matcher::Json(serde_json::json!({
                "amount": 12.5,
                "description": "Lunch",
                "category": "FOOD",
                "date": "2024-03-01"
            })))
            .with_status(200)
            .with_body(
                r#"{"id": 9, "amount": 12.5, "description": "Lunch", "category": "FOOD", "date": "2024-03-01"}"#,
            )
            .create_async()
            .await;

        let created = remote(&server).create(&token(), &draft).await.unwrap();
        mock.assert_async().await;
        assert_eq!(created.id().as_str(), "9");
    }

    #[tokio::test]
    async fn test_create_locates_record_after_text_reply() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/api/spendings/")
            .with_status(200)
            .with_body("Spending added successfully")
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/api/spendings/")
            .with_status(200)
            .with_body(
                r#"[
                {"id": 3, "amount": 12.5, "description": "Lunch", "category": "FOOD", "date": "2024-03-01"},
                {"id": 4, "amount": 9.0, "description": "Taxi", "category": "TRANSPORT", "date": "2024-03-01"},
                {"id": 5, "amount": 12.5, "description": "Lunch", "category": "FOOD", "date": "2024-03-01"}
            ]"#,
            )
            .create_async()
            .await;

        let created = remote(&server).create(&token(), &draft()).await.unwrap();
        assert_eq!(created.id().as_str(), "5");
    }

    #[tokio::test]
    async fn test_create_validation_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/spendings/")
            .with_status(400)
            .with_body("Error adding spending: bad date")
            .create_async()
            .await;

        let result = remote(&server).create(&token(), &draft()).await;
        assert_eq!(
            result,
            Err(ApiError::Validation(
                "Error adding spending: bad date".into()
            ))
        );
    }

    #[tokio::test]
    async fn test_delete_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api/spendings/77")
            .with_status(404)
            .create_async()
            .await;

        let id = TransactionId::from(77u64);
        let result = remote(&server).delete(&token(), &id).await;
        assert_eq!(result, Err(ApiError::NotFound(id)));
    }

    #[tokio::test]
    async fn test_delete_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/spendings/2")
            .match_header("authorization", "Bearer abc")
            .with_status(200)
            .with_body("Spending deleted successfully")
            .create_async()
            .await;

        remote(&server)
            .delete(&token(), &TransactionId::from(2u64))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_forbidden_is_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api/spendings/2")
            .with_status(403)
            .with_body("Not authorized to delete this spending")
            .create_async()
            .await;

        let result = remote(&server)
            .delete(&token(), &TransactionId::from(2u64))
            .await;
        assert_eq!(result, Err(ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_sign_in() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/signin")
            .match_body(Matcher::Json(
                serde_json::json!({"username": "demo", "password": "password"}),
            ))
            .with_status(200)
            .with_body(r#"{"token": "jwt-value", "type": "Bearer"}"#)
            .create_async()
            .await;

        let token = remote(&server)
            .sign_in(&Credentials::new("demo", "password"))
            .await
            .unwrap();
        assert_eq!(token.as_str(), "jwt-value");
    }

    #[tokio::test]
    async fn test_sign_in_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/signin")
            .with_status(401)
            .create_async()
            .await;

        let result = remote(&server)
            .sign_in(&Credentials::new("demo", "wrong"))
            .await;
        assert_eq!(result, Err(ApiError::Unauthorized));
    }

    #[tokio::test]
    async fn test_sign_up_taken_username() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/signup")
            .with_status(400)
            .with_body("Error: Username is already taken!")
            .create_async()
            .await;

        let result = remote(&server)
            .sign_up(&Registration::new("demo", "demo@example.com", "pw"))
            .await;
        assert_eq!(
            result,
            Err(ApiError::Validation(
                "Error: Username is already taken!".into()
            ))
        );
    }
}
