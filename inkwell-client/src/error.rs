use crate::api;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not logged in, set an auth token first")]
    NotLoggedIn,

    #[error("sending request to {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest_middleware::Error,
    },

    #[error(transparent)]
    Api(#[from] api::Error),

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("decoding response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    TokenStore(#[from] anyhow::Error),
}

impl Error {
    /// Whether the server refused the request because of who is asking
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Error::NotLoggedIn
                | Error::Api(api::Error::Unauthenticated)
                | Error::Api(api::Error::PermissionDenied)
        )
    }
}
