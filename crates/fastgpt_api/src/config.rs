use std::collections::BTreeMap;
use std::time::Duration;

use crate::url::DEFAULT_FASTGPT_BASE_URL;

/// Transport configuration for chat-completion requests.
#[derive(Debug, Clone)]
pub struct FastgptApiConfig {
    /// Bearer token passed to `Authorization`; empty for out-link access.
    pub bearer_token: String,
    /// Base URL for the chat proxy.
    pub base_url: String,
    /// Default `shareId` filled into requests that leave it empty.
    pub share_id: Option<String>,
    /// Default `outLinkUid` filled into requests that leave it empty.
    pub out_link_uid: Option<String>,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl Default for FastgptApiConfig {
    fn default() -> Self {
        Self {
            bearer_token: String::new(),
            base_url: DEFAULT_FASTGPT_BASE_URL.to_string(),
            share_id: None,
            out_link_uid: None,
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }
}

impl FastgptApiConfig {
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_share_id(mut self, share_id: impl Into<String>) -> Self {
        self.share_id = Some(share_id.into());
        self
    }

    pub fn with_out_link_uid(mut self, out_link_uid: impl Into<String>) -> Self {
        self.out_link_uid = Some(out_link_uid.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_headers.extend(headers);
        self
    }
}
