// API client module: a small blocking HTTP client for the Splitwise REST
// API. Every call is signed with OAuth 1.0a using the consumer credentials
// from `Config` and the user's access token.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;
use crate::oauth::{AccessToken, Signer};

const TEST_ENDPOINT: &str = "test";
const GROUPS_ENDPOINT: &str = "get_groups";
const CREATE_EXPENSE_ENDPOINT: &str = "create_expense";

/// A group the user belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Group {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Member {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub balance: Vec<Balance>,
}

impl Member {
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref().filter(|l| !l.is_empty()) {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// What a member is owed (positive) or owes (negative) in one currency.
/// The amount is kept as the decimal string the API returns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Balance {
    pub amount: String,
    pub currency_code: String,
}

/// Parameters for `create_expense`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub group_id: i64,
    pub cost: String,
    pub description: String,
    pub payment: bool,
}

impl NewExpense {
    fn form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("group_id", self.group_id.to_string()),
            ("cost", self.cost.clone()),
            ("description", self.description.clone()),
            ("payment", if self.payment { "1" } else { "0" }.to_string()),
        ]
    }
}

/// An expense as returned by the API; only the fields we display.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cost: String,
    #[serde(default)]
    pub currency_code: String,
    #[serde(default)]
    pub group_id: Option<i64>,
}

#[derive(Deserialize)]
struct GroupsResponse {
    groups: Vec<Group>,
}

#[derive(Deserialize)]
struct CreateExpenseResponse {
    #[serde(default)]
    expenses: Vec<Expense>,
    #[serde(default)]
    errors: serde_json::Value,
}

/// Signed client for the three API endpoints.
pub struct ApiClient {
    client: Client,
    config: Config,
    signer: Signer,
    token: AccessToken,
}

impl ApiClient {
    pub fn new(config: &Config, client: Client, token: AccessToken) -> Self {
        ApiClient {
            client,
            config: config.clone(),
            signer: config.signer(),
            token,
        }
    }

    /// Connectivity check. Only 200 counts; any other status is an error
    /// carrying the code.
    pub fn test_connection(&self) -> Result<(), ApiError> {
        let res = self.dispatch(Method::GET, TEST_ENDPOINT, &[])?;
        let status = res.status();
        let body = read_body(TEST_ENDPOINT, res)?;
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                endpoint: TEST_ENDPOINT.into(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Groups of the authenticated user.
    pub fn groups(&self) -> Result<Vec<Group>, ApiError> {
        let body = self.send(Method::GET, GROUPS_ENDPOINT, &[])?;
        let resp: GroupsResponse = decode(GROUPS_ENDPOINT, &body)?;
        Ok(resp.groups)
    }

    /// Create an expense and return what the server recorded.
    pub fn create_expense(&self, expense: &NewExpense) -> Result<Vec<Expense>, ApiError> {
        let form = expense.form();
        let form: Vec<(&str, &str)> = form.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let body = self.send(Method::POST, CREATE_EXPENSE_ENDPOINT, &form)?;
        let resp: CreateExpenseResponse = decode(CREATE_EXPENSE_ENDPOINT, &body)?;
        if has_errors(&resp.errors) {
            return Err(ApiError::Rejected {
                endpoint: CREATE_EXPENSE_ENDPOINT.into(),
                errors: resp.errors.to_string(),
            });
        }
        Ok(resp.expenses)
    }

    fn send(&self, method: Method, endpoint: &str, form: &[(&str, &str)]) -> Result<String, ApiError> {
        let res = self.dispatch(method, endpoint, form)?;
        read_body(endpoint, res)
    }

    fn dispatch(&self, method: Method, endpoint: &str, form: &[(&str, &str)]) -> Result<Response, ApiError> {
        let url = self.config.endpoint(endpoint)?;
        let header = self
            .signer
            .authorization_header(method.as_str(), &url, form, Some(&self.token), &[]);
        debug!(%method, endpoint, "sending signed request");

        let mut req = self.client.request(method, url).header(AUTHORIZATION, header);
        if !form.is_empty() {
            req = req.form(form);
        }
        Ok(req.send()?)
    }
}

/// Build the shared blocking HTTP client.
pub fn http_client() -> Result<Client, ApiError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(client)
}

/// Read a response body, turning any non-2xx status into an error.
pub(crate) fn read_body(endpoint: &str, res: Response) -> Result<String, ApiError> {
    let status = res.status();
    let body = res.text()?;
    debug!(endpoint, status = status.as_u16(), "response received");
    if !status.is_success() {
        return Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn has_errors(errors: &serde_json::Value) -> bool {
    match errors {
        serde_json::Value::Null => false,
        serde_json::Value::Object(map) => !map.is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
