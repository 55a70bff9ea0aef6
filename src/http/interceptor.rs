//! Request/response interception
//!
//! Request phase: merge body and query parameters, encrypt them into an
//! envelope, attach session and module/action headers.
//!
//! Response phase: unwrap envelopes on success, wipe the session on
//! authentication failures, unwrap envelopes carried by other errors.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::request::ApiRequest;
use super::response::ApiResponse;
use super::tagging::{RouteTagTable, ACTION_HEADER, MODULE_HEADER};
use crate::crypto::{Envelope, PayloadCodec};
use crate::error::{CryptoError, HttpError, PortalError};
use crate::session::SessionStore;

/// Header carrying the logged-in user's id
pub const USER_ID_HEADER: &str = "userid";

/// 401 messages that mean the session is no longer valid (substring, case-sensitive)
pub const SESSION_INVALIDATION_PHRASES: [&str; 4] = [
    "Invalid JWT signature",
    "Token expired",
    "Authentication error",
    "JWT expired",
];

/// Forces the host application back to its entry point
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &str);
}

/// Navigator that only records the redirect in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, target: &str) {
        tracing::warn!(target_path = target, "Session invalidated, redirecting");
    }
}

/// Encrypting, session-aware interceptor pair
#[derive(Clone)]
pub struct SecureInterceptor {
    codec: PayloadCodec,
    session: SessionStore,
    tags: RouteTagTable,
    navigator: Arc<dyn Navigator>,
    app_root: String,
}

impl SecureInterceptor {
    pub fn new(codec: PayloadCodec, session: SessionStore, tags: RouteTagTable) -> Self {
        Self {
            codec,
            session,
            tags,
            navigator: Arc::new(LogNavigator),
            app_root: "/".to_string(),
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_app_root(mut self, app_root: &str) -> Self {
        self.app_root = app_root.to_string();
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn codec(&self) -> &PayloadCodec {
        &self.codec
    }

    /// Prepare an outgoing request.
    ///
    /// Fails without touching the wire if the payload cannot be encrypted.
    pub fn on_request(&self, mut request: ApiRequest) -> Result<ApiRequest, PortalError> {
        if request.has_payload() {
            let merged = merge_payload(request.body.take(), std::mem::take(&mut request.params))?;
            let envelope = self.codec.encrypt_json(&merged).map_err(|e| {
                tracing::error!(request_id = %request.id, error = %e, "Refusing to send unencrypted payload");
                e
            })?;
            request.body = Some(envelope.to_value());
        }

        if let Some(token) = self.session.token() {
            request
                .headers
                .insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        if let Some(user_id) = self.session.user_id() {
            request.headers.insert(USER_ID_HEADER.to_string(), user_id);
        }

        if let Some(tag) = self.tags.resolve(&request.path) {
            tracing::debug!(path = %request.path, module = %tag.module, "Tagged request");
            request
                .headers
                .insert(MODULE_HEADER.to_string(), tag.module.clone());
            request
                .headers
                .insert(ACTION_HEADER.to_string(), tag.action.clone());
        }

        Ok(request)
    }

    /// Process a response the server answered with.
    ///
    /// 2xx responses always resolve; anything else is rejected, either as
    /// [`HttpError::SessionExpired`] or [`HttpError::Status`].
    pub fn on_response(&self, response: ApiResponse) -> Result<ApiResponse, HttpError> {
        if response.is_success() {
            return Ok(self.unwrap_envelope(response));
        }
        Err(self.on_error(response))
    }

    fn on_error(&self, response: ApiResponse) -> HttpError {
        if let Some(message) = session_invalidation_message(&response) {
            if let Err(e) = self.session.clear() {
                tracing::error!(error = %e, "Failed to persist cleared session");
            }
            self.navigator.navigate(&self.app_root);
            return HttpError::SessionExpired { message };
        }

        let response = self.unwrap_envelope(response);
        HttpError::Status {
            status: response.status,
            reason: response.status_text.clone(),
            response: Box::new(response),
        }
    }

    /// Replace an envelope body with its decrypted JSON. Failures keep the original body.
    fn unwrap_envelope(&self, mut response: ApiResponse) -> ApiResponse {
        let Some(value) = response.json_value() else {
            return response;
        };
        let Some(payload) = Envelope::detect(&value) else {
            return response;
        };

        match self
            .codec
            .decrypt_json(payload)
            .and_then(|plain| serde_json::to_vec(&plain).map_err(|e| CryptoError::Decryption(e.to_string())))
        {
            Ok(body) => {
                response.body = body;
                response.decrypted = true;
            }
            Err(e) => {
                tracing::warn!(status = response.status, error = %e, "Failed to decrypt response, passing through");
            }
        }
        response
    }
}

/// `{...body, ...params}`: query parameters overwrite body fields on collision.
///
/// A non-object body is sent as is when there are no params to merge into it.
fn merge_payload(body: Option<Value>, params: Map<String, Value>) -> Result<Value, HttpError> {
    let mut merged = match body {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(fields)) => fields,
        Some(other) if params.is_empty() => return Ok(other),
        Some(other) => {
            return Err(HttpError::InvalidBody(format!(
                "cannot merge query params into {}",
                json_kind(&other)
            )))
        }
    };
    merged.extend(params);
    Ok(Value::Object(merged))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The server message if this is a 401 that invalidates the session
fn session_invalidation_message(response: &ApiResponse) -> Option<String> {
    if response.status != 401 {
        return None;
    }
    response
        .message()
        .filter(|message| SESSION_INVALIDATION_PHRASES.iter().any(|p| message.contains(p)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, SESSION_KEYS};
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingNavigator {
        visits: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, target: &str) {
            self.visits.lock().push(target.to_string());
        }
    }

    fn logged_in() -> SessionStore {
        let store = SessionStore::new();
        store
            .init(Session::new("tok", "7").with_role("2").with_incubatee_user("9"))
            .unwrap();
        store
    }

    fn interceptor(session: SessionStore) -> SecureInterceptor {
        SecureInterceptor::new(PayloadCodec::default(), session, RouteTagTable::default())
    }

    #[test]
    fn test_body_and_params_are_encrypted_together() {
        let interceptor = interceptor(SessionStore::new());
        let request = ApiRequest::builder()
            .method("POST")
            .path("/getcombystage")
            .json(json!({"a": 1}))
            .param("b", 2)
            .build();

        let out = interceptor.on_request(request).unwrap();
        assert!(out.params.is_empty());

        let body = out.body.unwrap();
        let payload = Envelope::detect(&body).unwrap();
        assert!(!payload.contains("\"a\""));

        let plain = interceptor.codec().decrypt_json(payload).unwrap();
        assert_eq!(plain, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_params_win_on_collision() {
        let interceptor = interceptor(SessionStore::new());
        let request = ApiRequest::builder()
            .path("/x")
            .json(json!({"k": "body", "only_body": true}))
            .param("k", "param")
            .build();

        let out = interceptor.on_request(request).unwrap();
        let payload = Envelope::detect(out.body.as_ref().unwrap()).unwrap().to_string();
        let plain = interceptor.codec().decrypt_json(&payload).unwrap();
        assert_eq!(plain["k"], "param");
        assert_eq!(plain["only_body"], true);
    }

    #[test]
    fn test_params_only_get_is_encrypted() {
        let interceptor = interceptor(SessionStore::new());
        let request = ApiRequest::builder().path("/getspocs").param("incuserid", "9").build();

        let out = interceptor.on_request(request).unwrap();
        assert!(out.params.is_empty());
        assert!(Envelope::detect(out.body.as_ref().unwrap()).is_some());
    }

    #[test]
    fn test_no_payload_no_body() {
        let interceptor = interceptor(SessionStore::new());
        let out = interceptor.on_request(ApiRequest::new("GET", "/getusers")).unwrap();
        assert!(out.body.is_none());
    }

    #[test]
    fn test_non_object_body_without_params_is_encrypted() {
        let interceptor = interceptor(SessionStore::new());
        let request = ApiRequest::builder().path("/x").json(json!([1, 2])).build();
        let out = interceptor.on_request(request).unwrap();
        let payload = out.body.as_ref().and_then(Envelope::detect).unwrap();
        assert_eq!(interceptor.codec().decrypt_json(payload).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_non_object_body_with_params_is_rejected() {
        let interceptor = interceptor(SessionStore::new());
        let request = ApiRequest::builder()
            .path("/x")
            .json(json!([1, 2]))
            .param("page", 1)
            .build();
        assert!(matches!(
            interceptor.on_request(request),
            Err(PortalError::Http(HttpError::InvalidBody(_)))
        ));
    }

    #[test]
    fn test_session_headers() {
        let logged = interceptor(logged_in());
        let out = logged.on_request(ApiRequest::new("GET", "/x")).unwrap();
        assert_eq!(out.header("Authorization"), Some("Bearer tok"));
        assert_eq!(out.header(USER_ID_HEADER), Some("7"));

        let anonymous = interceptor(SessionStore::new());
        let out = anonymous.on_request(ApiRequest::new("GET", "/x")).unwrap();
        assert!(out.header("Authorization").is_none());
        assert!(out.header(USER_ID_HEADER).is_none());
    }

    #[test]
    fn test_module_action_headers() {
        let interceptor = interceptor(SessionStore::new());
        let out = interceptor.on_request(ApiRequest::new("POST", "/auth/logout")).unwrap();
        assert_eq!(out.header(MODULE_HEADER), Some("log_out"));
        assert_eq!(out.header(ACTION_HEADER), Some("user Logout attempt"));

        let out = interceptor.on_request(ApiRequest::new("GET", "/getusers")).unwrap();
        assert!(out.header(MODULE_HEADER).is_none());
        assert!(out.header(ACTION_HEADER).is_none());
    }

    #[test]
    fn test_success_envelope_is_decrypted() {
        let interceptor = interceptor(SessionStore::new());
        let envelope = interceptor.codec().encrypt_json(&json!({"data": [1, 2]})).unwrap();
        let response = ApiResponse::json_body(200, &envelope.to_value());

        let out = interceptor.on_response(response).unwrap();
        assert!(out.decrypted);
        assert_eq!(out.json_value().unwrap(), json!({"data": [1, 2]}));
    }

    #[test]
    fn test_undecryptable_success_passes_through() {
        let interceptor = interceptor(SessionStore::new());
        let body = json!({"payload": "garbage"});
        let out = interceptor
            .on_response(ApiResponse::json_body(200, &body))
            .unwrap();
        assert!(!out.decrypted);
        assert_eq!(out.json_value().unwrap(), body);
    }

    #[test]
    fn test_plain_success_untouched() {
        let interceptor = interceptor(SessionStore::new());
        let out = interceptor
            .on_response(ApiResponse {
                status: 204,
                ..Default::default()
            })
            .unwrap();
        assert!(out.body.is_empty());
    }

    #[test]
    fn test_jwt_expired_clears_session() {
        let session = logged_in();
        let navigator = Arc::new(RecordingNavigator::default());
        let interceptor = interceptor(session.clone()).with_navigator(navigator.clone());

        let response = ApiResponse::json_body(401, &json!({"message": "JWT expired at 10:00"}));
        let err = interceptor.on_response(response).unwrap_err();

        assert!(matches!(err, HttpError::SessionExpired { .. }));
        let snapshot = session.read();
        for key in SESSION_KEYS {
            assert!(snapshot.get(key).is_none());
        }
        assert_eq!(navigator.visits.lock().as_slice(), ["/"]);
    }

    #[test]
    fn test_phrase_match_is_case_sensitive() {
        let session = logged_in();
        let interceptor = interceptor(session.clone());
        let response = ApiResponse::json_body(401, &json!({"message": "jwt expired"}));

        let err = interceptor.on_response(response).unwrap_err();
        assert!(matches!(err, HttpError::Status { status: 401, .. }));
        assert!(session.is_active());
    }

    #[test]
    fn test_forbidden_is_forwarded() {
        let session = logged_in();
        let navigator = Arc::new(RecordingNavigator::default());
        let interceptor = interceptor(session.clone()).with_navigator(navigator.clone());
        let response = ApiResponse::json_body(403, &json!({"message": "Token expired"}));

        let err = interceptor.on_response(response).unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.response().unwrap().message().as_deref(), Some("Token expired"));
        assert!(session.is_active());
        assert!(navigator.visits.lock().is_empty());
    }

    #[test]
    fn test_error_envelope_is_decrypted() {
        let interceptor = interceptor(SessionStore::new());
        let envelope = interceptor
            .codec()
            .encrypt_json(&json!({"message": "Duplicate company"}))
            .unwrap();
        let response = ApiResponse::json_body(409, &envelope.to_value());

        let err = interceptor.on_response(response).unwrap_err();
        let response = err.response().unwrap();
        assert!(response.decrypted);
        assert_eq!(response.message().as_deref(), Some("Duplicate company"));
    }

    #[test]
    fn test_encrypted_401_is_not_a_session_wipe() {
        let session = logged_in();
        let interceptor = interceptor(session.clone());
        let envelope = interceptor
            .codec()
            .encrypt_json(&json!({"message": "JWT expired"}))
            .unwrap();

        let err = interceptor
            .on_response(ApiResponse::json_body(401, &envelope.to_value()))
            .unwrap_err();
        assert!(matches!(err, HttpError::Status { status: 401, .. }));
        assert!(session.is_active());
    }
}
