//! JSON-RPC client for the WebUntis API.
//!
//! Handles session login/logout, request envelopes and mapping of HTTP and
//! RPC failures onto [`ProviderError`].

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::provider::Entity;
use crate::raw_lesson::RawLesson;

use super::config::WebUntisConfig;

/// RPC error code returned for requests without a valid session.
const NOT_AUTHENTICATED: i64 = -8520;

/// Fields requested for every element type in `getTimetable`.
const ELEMENT_FIELDS: [&str; 3] = ["id", "name", "longname"];

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    id: &'a str,
    method: &'a str,
    params: P,
    jsonrpc: &'static str,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct AuthParams<'a> {
    user: &'a str,
    password: &'a str,
    client: &'a str,
}

/// Result of a successful `authenticate` call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session id, sent back as the `JSESSIONID` cookie.
    pub session_id: String,
    /// Element type of the logged-in person, if reported.
    #[serde(default)]
    pub person_type: Option<i64>,
}

/// A class or student as listed by `getKlassen` / `getStudents`.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedElement {
    /// Element id.
    pub id: i64,
    /// Short name.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
struct TimetableParams {
    options: TimetableOptions,
}

#[derive(Debug, Serialize)]
struct ElementRef {
    id: i64,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimetableOptions {
    element: ElementRef,
    start_date: String,
    end_date: String,
    show_booking: bool,
    show_info: bool,
    show_subst_text: bool,
    show_ls_text: bool,
    show_studentgroup: bool,
    klasse_fields: [&'static str; 3],
    room_fields: [&'static str; 3],
    subject_fields: [&'static str; 3],
    teacher_fields: [&'static str; 3],
}

impl TimetableOptions {
    fn new(entity: Entity, first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            element: ElementRef {
                id: entity.id,
                kind: entity.kind.code(),
            },
            start_date: first.format("%Y%m%d").to_string(),
            end_date: last.format("%Y%m%d").to_string(),
            show_booking: true,
            show_info: true,
            show_subst_text: true,
            show_ls_text: true,
            show_studentgroup: true,
            klasse_fields: ELEMENT_FIELDS,
            room_fields: ELEMENT_FIELDS,
            subject_fields: ELEMENT_FIELDS,
            teacher_fields: ELEMENT_FIELDS,
        }
    }
}

/// HTTP client for WebUntis JSON-RPC calls.
pub struct WebUntisClient {
    client: Client,
    config: WebUntisConfig,
}

impl WebUntisClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: WebUntisConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::network(format!("Failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self { client, config })
    }

    /// Logs in and returns a new session.
    pub async fn authenticate(&self) -> ProviderResult<Session> {
        if !self.config.has_credentials() {
            return Err(ProviderError::configuration(
                "WebUntis username and password are required",
            ));
        }

        let params = AuthParams {
            user: &self.config.username,
            password: &self.config.password,
            client: &self.config.client_name,
        };

        let session: Session = self
            .call("authenticate", params, None)
            .await
            .map_err(login_error)?;

        debug!(
            endpoint = self.config.endpoint_str(),
            school = %self.config.school,
            person_type = ?session.person_type,
            "Authenticated with WebUntis"
        );
        Ok(session)
    }

    /// Ends a session.
    pub async fn logout(&self, session: &Session) -> ProviderResult<()> {
        let _: Value = self
            .call("logout", serde_json::json!({}), Some(&session.session_id))
            .await?;
        Ok(())
    }

    /// Lists the classes visible to the session.
    pub async fn classes(&self, session: &Session) -> ProviderResult<Vec<NamedElement>> {
        self.call("getKlassen", serde_json::json!({}), Some(&session.session_id))
            .await
    }

    /// Lists the students visible to the session.
    pub async fn students(&self, session: &Session) -> ProviderResult<Vec<NamedElement>> {
        self.call("getStudents", serde_json::json!({}), Some(&session.session_id))
            .await
    }

    /// Fetches the timetable of `entity` for the inclusive range
    /// `first..=last`.
    ///
    /// Records that do not fit the [`RawLesson`] shape are logged and
    /// dropped; the rest of the response is kept.
    pub async fn timetable(
        &self,
        session: &Session,
        entity: Entity,
        first: NaiveDate,
        last: NaiveDate,
    ) -> ProviderResult<Vec<RawLesson>> {
        let params = TimetableParams {
            options: TimetableOptions::new(entity, first, last),
        };
        let records: Vec<Value> = self
            .call("getTimetable", params, Some(&session.session_id))
            .await?;
        Ok(decode_records(records))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &WebUntisConfig {
        &self.config
    }

    async fn call<P, T>(&self, method: &str, params: P, session_id: Option<&str>) -> ProviderResult<T>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let request = RpcRequest {
            id: &self.config.client_name,
            method,
            params,
            jsonrpc: "2.0",
        };
        let body = serde_json::to_string(&request).map_err(|e| {
            ProviderError::invalid_response(format!("Failed to encode {method} request"))
                .with_source(e)
        })?;

        let mut http = self
            .client
            .post(self.config.endpoint.clone())
            .header("Content-Type", "application/json")
            .body(body);
        if let Some(id) = session_id {
            http = http.header("Cookie", format!("JSESSIONID={id}"));
        }

        trace!(method = %method, "Sending JSON-RPC request");

        let response = http.send().await.map_err(|e| {
            ProviderError::network(format!("{method} request failed: {}", e)).with_source(e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            ProviderError::network(format!("Failed to read {method} response: {}", e))
                .with_source(e)
        })?;

        match status {
            StatusCode::OK => decode_response(method, &text),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                ProviderError::authentication(format!("{method} rejected with status {status}")),
            ),
            s if s.is_server_error() => Err(ProviderError::server(format!(
                "Server error ({}): {}",
                s, text
            ))),
            s => {
                warn!(status = %s, method = %method, "Unexpected response status");
                Err(ProviderError::invalid_response(format!(
                    "Unexpected status {}: {}",
                    s, text
                )))
            }
        }
    }
}

/// Decodes a JSON-RPC response body into its result.
fn decode_response<T: DeserializeOwned>(method: &str, body: &str) -> ProviderResult<T> {
    let response: RpcResponse<T> = serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("Malformed {method} response: {}", e))
            .with_source(e)
    })?;

    if let Some(error) = response.error {
        let message = format!("{method} failed ({}): {}", error.code, error.message);
        return Err(if error.code == NOT_AUTHENTICATED {
            ProviderError::authentication(message)
        } else {
            ProviderError::server(message)
        });
    }

    // Methods like `logout` answer with a null result.
    match response.result {
        Some(result) => Ok(result),
        None => serde_json::from_value(Value::Null).map_err(|_| {
            ProviderError::invalid_response(format!("{method} response has no result"))
        }),
    }
}

/// Maps a failed `authenticate` call.
///
/// Only a rejection by the server means the login failed; transport and
/// decoding failures keep their own code.
fn login_error(error: ProviderError) -> ProviderError {
    match error.code() {
        ProviderErrorCode::AuthenticationFailed | ProviderErrorCode::ServerError => {
            ProviderError::authentication(format!("Login failed: {}", error.message()))
        }
        _ => error,
    }
}

fn decode_records(records: Vec<Value>) -> Vec<RawLesson> {
    records
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawLesson>(value) {
            Ok(raw) => Some(raw),
            Err(error) => {
                warn!(%error, "Dropping undecodable timetable record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let config = WebUntisConfig::new("mese.webuntis.com", "demo")
            .unwrap()
            .with_credentials("student", "secret");
        assert!(WebUntisClient::new(config).is_ok());
    }

    #[tokio::test]
    async fn authenticate_requires_credentials() {
        let config = WebUntisConfig::new("mese.webuntis.com", "demo").unwrap();
        let client = WebUntisClient::new(config).unwrap();
        let err = client.authenticate().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let config = WebUntisConfig::new("http://127.0.0.1:1", "demo")
            .unwrap()
            .with_credentials("student", "secret");
        let client = WebUntisClient::new(config).unwrap();
        let err = client.authenticate().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
    }

    #[test]
    fn login_error_mapping() {
        let rejected = login_error(ProviderError::server("authenticate failed (-8504): bad credentials"));
        assert_eq!(rejected.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(rejected.message().starts_with("Login failed: "));

        let offline = login_error(ProviderError::network("connection refused"));
        assert_eq!(offline.code(), ProviderErrorCode::NetworkError);
        assert_eq!(offline.message(), "connection refused");

        let garbled = login_error(ProviderError::invalid_response("Malformed authenticate response"));
        assert_eq!(garbled.code(), ProviderErrorCode::InvalidResponse);
    }

    #[test]
    fn request_envelope() {
        let request = RpcRequest {
            id: "untiscal",
            method: "authenticate",
            params: AuthParams {
                user: "student",
                password: "secret",
                client: "untiscal",
            },
            jsonrpc: "2.0",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["method"], "authenticate");
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["params"]["user"], "student");
        assert_eq!(json["params"]["client"], "untiscal");
    }

    #[test]
    fn timetable_options_shape() {
        let options = TimetableOptions::new(
            Entity::student(42),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 28).unwrap(),
        );
        let json = serde_json::to_value(TimetableParams { options }).unwrap();
        let options = &json["options"];

        assert_eq!(options["element"]["id"], 42);
        assert_eq!(options["element"]["type"], 5);
        assert_eq!(options["startDate"], "20240101");
        assert_eq!(options["endDate"], "20240128");
        assert_eq!(options["showSubstText"], true);
        assert_eq!(options["showLsText"], true);
        assert_eq!(options["klasseFields"][2], "longname");
    }

    mod decode {
        use super::*;

        #[test]
        fn session() {
            let body = r#"{"jsonrpc":"2.0","id":"untiscal","result":{"sessionId":"ABC123","personType":5,"personId":77,"klasseId":12}}"#;
            let session: Session = decode_response("authenticate", body).unwrap();
            assert_eq!(session.session_id, "ABC123");
            assert_eq!(session.person_type, Some(5));
        }

        #[test]
        fn rpc_error_maps_to_server_error() {
            let body = r#"{"jsonrpc":"2.0","id":"untiscal","error":{"code":-32601,"message":"Method not found"}}"#;
            let err = decode_response::<Value>("getTimetable", body).unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::ServerError);
            assert!(err.message().contains("Method not found"));
        }

        #[test]
        fn not_authenticated_maps_to_authentication() {
            let body = r#"{"jsonrpc":"2.0","id":"untiscal","error":{"code":-8520,"message":"not authenticated"}}"#;
            let err = decode_response::<Value>("getTimetable", body).unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        }

        #[test]
        fn garbage_is_invalid_response() {
            let err = decode_response::<Value>("getKlassen", "<html>").unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);

            let err = decode_response::<Vec<NamedElement>>("getKlassen", r#"{"jsonrpc":"2.0"}"#)
                .unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
        }

        #[test]
        fn null_result_is_accepted_for_values() {
            let body = r#"{"jsonrpc":"2.0","id":"x","result":null}"#;
            let value: Value = decode_response("logout", body).unwrap();
            assert!(value.is_null());
        }

        #[test]
        fn records_skip_wrong_shapes() {
            let records = vec![
                serde_json::json!({"id": 1, "date": 20240131, "startTime": 800, "endTime": 845}),
                serde_json::json!({"id": 2, "date": "tomorrow"}),
                serde_json::json!({"id": 3, "date": 20240131, "su": [{"name": "MA"}]}),
            ];
            let raws = decode_records(records);
            assert_eq!(raws.len(), 2);
            assert_eq!(raws[0].id, Some(1));
            assert_eq!(raws[1].subjects[0].name.as_deref(), Some("MA"));
        }

        #[test]
        fn named_elements() {
            let body = r#"{"jsonrpc":"2.0","id":"x","result":[{"id":12,"name":"5a","longName":"Class 5a"}]}"#;
            let classes: Vec<NamedElement> = decode_response("getKlassen", body).unwrap();
            assert_eq!(classes[0].id, 12);
            assert_eq!(classes[0].name.as_deref(), Some("5a"));
        }
    }
}
