//! Implements `Repository` and `AuthApi` using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without a running service.

use crate::api::{AuthApi, Credentials, Registration, Repository, Token};
use crate::error::{ApiError, ApiResult};
use crate::model::{Amount, Category, Transaction, TransactionDraft, TransactionId};
use crate::Result;
use anyhow::Context;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// The username of the account the test service is seeded with.
pub const DEMO_USERNAME: &str = "demo";

/// The password of the account the test service is seeded with.
pub const DEMO_PASSWORD: &str = "password";

const DEMO_EMAIL: &str = "demo@example.com";

/// An in-memory stand-in for the spending service. Clones share the same state, so a test can keep
/// one handle to inspect what the code under test did through another.
#[derive(Debug, Clone)]
pub struct TestRemote {
    state: Arc<Mutex<TestState>>,
}

#[derive(Debug, Default)]
struct TestState {
    users: Vec<User>,
    tokens: HashMap<String, String>,
    transactions: HashMap<String, Vec<Transaction>>,
    submissions: HashMap<Uuid, Transaction>,
    next_id: u64,
    tokens_expired: bool,
    fail_next: Option<ApiError>,
    fail_next_list: Option<ApiError>,
}

#[derive(Debug, Clone)]
struct User {
    username: String,
    email: String,
    password: String,
}

impl TestRemote {
    /// A service that has no accounts and no transactions.
    pub fn empty() -> Self {
        Self::with_state(TestState {
            next_id: 1,
            ..TestState::default()
        })
    }

    /// A service with the demo account, which owns the transactions in the seed data.
    pub fn seeded() -> Result<Self> {
        let transactions = load_csv(TRANSACTION_DATA).context("Unable to load the seed data")?;
        let next_id = transactions.len() as u64 + 1;
        let mut state = TestState {
            next_id,
            ..TestState::default()
        };
        state.users.push(User {
            username: DEMO_USERNAME.to_string(),
            email: DEMO_EMAIL.to_string(),
            password: DEMO_PASSWORD.to_string(),
        });
        state
            .transactions
            .insert(DEMO_USERNAME.to_string(), transactions);
        Ok(Self::with_state(state))
    }

    fn with_state(state: TestState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Makes the next repository call fail with `error` instead of doing its work.
    pub async fn fail_next(&self, error: ApiError) {
        self.state.lock().await.fail_next = Some(error);
    }

    /// Makes the next `list` call fail with `error`. Other calls are unaffected.
    pub async fn fail_next_list(&self, error: ApiError) {
        self.state.lock().await.fail_next_list = Some(error);
    }

    /// The transactions stored for `username`, in the order they were added.
    pub async fn transactions_of(&self, username: &str) -> Vec<Transaction> {
        self.state
            .lock()
            .await
            .transactions
            .get(username)
            .cloned()
            .unwrap_or_default()
    }

    /// Issues a token for `username` without checking a password.
    #[cfg(test)]
    pub(crate) async fn token_for(&self, username: &str) -> Token {
        let mut state = self.state.lock().await;
        state.issue_token(username)
    }

    /// Rejects every token from now on, as if they had all expired.
    #[cfg(test)]
    pub(crate) async fn expire_tokens(&self) {
        self.state.lock().await.tokens_expired = true;
    }
}

impl TestState {
    /// Tokens look like `test-{username}-{random}` so that a token stored by one run of the
    /// program is still recognized by the next, which starts from fresh seed data.
    fn issue_token(&mut self, username: &str) -> Token {
        let value = format!("test-{username}-{}", Uuid::new_v4().simple());
        self.tokens.insert(value.clone(), username.to_string());
        Token::new(value)
    }

    fn username(&self, token: &Token) -> ApiResult<String> {
        if self.tokens_expired {
            return Err(ApiError::Unauthorized);
        }
        if let Some(username) = self.tokens.get(token.as_str()) {
            return Ok(username.clone());
        }
        token
            .as_str()
            .strip_prefix("test-")
            .and_then(|rest| rest.rsplit_once('-'))
            .map(|(username, _)| username)
            .filter(|username| self.users.iter().any(|u| u.username == *username))
            .map(str::to_string)
            .ok_or(ApiError::Unauthorized)
    }

    fn take_failure(&mut self) -> ApiResult<()> {
        match self.fail_next.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl Repository for TestRemote {
    async fn list(&self, token: &Token) -> ApiResult<Vec<Transaction>> {
        let mut state = self.state.lock().await;
        state.take_failure()?;
        if let Some(e) = state.fail_next_list.take() {
            return Err(e);
        }
        let username = state.username(token)?;
        Ok(state
            .transactions
            .get(&username)
            .cloned()
            .unwrap_or_default())
    }

    async fn create(&self, token: &Token, draft: &TransactionDraft) -> ApiResult<Transaction> {
        let mut state = self.state.lock().await;
        state.take_failure()?;
        let username = state.username(token)?;
        draft.validate()?;

        if let Some(existing) = state.submissions.get(&draft.submission_key()) {
            return Ok(existing.clone());
        }

        let id = state.next_id;
        state.next_id += 1;
        let created = Transaction::from_draft(id, draft);
        state
            .transactions
            .entry(username)
            .or_default()
            .push(created.clone());
        state
            .submissions
            .insert(draft.submission_key(), created.clone());
        Ok(created)
    }

    async fn delete(&self, token: &Token, id: &TransactionId) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        state.take_failure()?;
        let username = state.username(token)?;

        let owned = state.transactions.entry(username.clone()).or_default();
        if let Some(index) = owned.iter().position(|t| t.id() == id) {
            owned.remove(index);
            return Ok(());
        }

        let someone_else_owns_it = state
            .transactions
            .iter()
            .any(|(owner, list)| owner != &username && list.iter().any(|t| t.id() == id));
        if someone_else_owns_it {
            Err(ApiError::Unauthorized)
        } else {
            Err(ApiError::NotFound(id.clone()))
        }
    }
}

#[async_trait::async_trait]
impl AuthApi for TestRemote {
    async fn sign_up(&self, registration: &Registration) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        if state
            .users
            .iter()
            .any(|u| u.username == registration.username())
        {
            return Err(ApiError::Validation(
                "Error: Username is already taken!".into(),
            ));
        }
        if state.users.iter().any(|u| u.email == registration.email()) {
            return Err(ApiError::Validation("Error: Email is already in use!".into()));
        }
        state.users.push(User {
            username: registration.username().to_string(),
            email: registration.email().to_string(),
            password: registration.password().to_string(),
        });
        Ok(())
    }

    async fn sign_in(&self, credentials: &Credentials) -> ApiResult<Token> {
        let mut state = self.state.lock().await;
        let known = state.users.iter().any(|u| {
            u.username == credentials.username() && u.password == credentials.password()
        });
        if !known {
            return Err(ApiError::Unauthorized);
        }
        Ok(state.issue_token(credentials.username()))
    }
}

/// Loads transactions from a CSV-formatted string with a header row. Ids are assigned in row
/// order starting at 1.
fn load_csv(csv_data: &str) -> Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut transactions = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        let field = |i: usize| {
            record
                .get(i)
                .with_context(|| format!("Seed row {} is missing column {i}", index + 1))
        };
        let date = NaiveDate::from_str(field(0)?)
            .with_context(|| format!("Bad date in seed row {}", index + 1))?;
        let description = field(1)?;
        let category = Category::from_str(field(2)?)
            .with_context(|| format!("Bad category in seed row {}", index + 1))?;
        let amount = Amount::from_str(field(3)?)
            .with_context(|| format!("Bad amount in seed row {}", index + 1))?;
        transactions.push(Transaction::new(
            index as u64 + 1,
            amount,
            description,
            category,
            date,
        ));
    }
    Ok(transactions)
}

/// Seed transaction data, in the order the demo user added it.
const TRANSACTION_DATA: &str = r##"Date,Description,Category,Amount
2024-01-05,Weekly groceries,FOOD,84.20
2024-01-09,Monthly bus pass,TRANSPORT,55.00
2024-01-15,Electricity bill,UTILITIES,72.35
2024-01-21,Cinema tickets,ENTERTAINMENT,24.00
2024-02-02,Pharmacy,HEALTH,18.75
2024-02-10,Dinner with friends,FOOD,46.90
2024-02-14,Concert,ENTERTAINMENT,65.00
2024-02-27,Water bill,UTILITIES,31.10
2024-03-03,Weekly groceries,FOOD,91.45
2024-03-08,Taxi to airport,TRANSPORT,38.60
2024-03-19,Gym membership,HEALTH,40.00
2024-03-25,Birthday gift,OTHER,35.00
"##;
