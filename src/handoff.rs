//! Hand-off to the downstream interactive authorization endpoint.
//!
//! A verified device flow continues as a standard interactive authorization
//! request: the inbound query is carried over with the device-flow
//! parameters overlaid on top. This is a pure request transformation; all
//! state changes happen in the verifier and resolver before it runs.

use crate::verifier::VerifiedDevice;

/// Sentinel `response_type` marking an authorization request that originated
/// from a device flow, so the downstream endpoint can tell it apart from a
/// normal interactive request.
pub const RESPONSE_TYPE_DEVICE: &str = "device";

/// Parameters the overlay owns; inbound values for these are dropped.
const OVERLAID: [&str; 5] = ["client_id", "response_type", "redirect_uri", "scope", "nonce"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeHandoff {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
    /// The user code itself, reused as the correlation token binding the
    /// downstream authorization back to this device-flow attempt.
    pub nonce: String,
}

impl AuthorizeHandoff {
    pub fn new(device: VerifiedDevice, redirect_uri: String, user_code: &str) -> Self {
        Self {
            client_id: device.client_id,
            redirect_uri,
            scope: device.scope,
            nonce: user_code.to_string(),
        }
    }

    /// Merge the inbound query pairs with the device-flow parameters.
    /// Unrelated inbound parameters pass through untouched; the `user_code`
    /// parameter is dropped (it travels on as the nonce).
    pub fn overlay(&self, inbound: &[(String, String)]) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = inbound
            .iter()
            .filter(|(k, _)| k != "user_code" && !OVERLAID.contains(&k.as_str()))
            .cloned()
            .collect();

        params.push(("client_id".to_string(), self.client_id.clone()));
        params.push(("response_type".to_string(), RESPONSE_TYPE_DEVICE.to_string()));
        params.push(("redirect_uri".to_string(), self.redirect_uri.clone()));
        if let Some(scope) = &self.scope {
            params.push(("scope".to_string(), scope.clone()));
        }
        params.push(("nonce".to_string(), self.nonce.clone()));
        params
    }

    /// Render the downstream authorize URL carrying the overlaid query.
    pub fn location(&self, authorize_url: &str, inbound: &[(String, String)]) -> String {
        let qs = serde_urlencoded::to_string(self.overlay(inbound)).unwrap_or_default();
        let sep = if authorize_url.contains('?') { '&' } else { '?' };
        format!("{authorize_url}{sep}{qs}")
    }
}
