use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[cfg(feature = "http")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("chat sign-in failed: {0}")]
    SignIn(String),

    #[error("chat feed error: {0}")]
    Feed(String),

    #[error("chat service is shut down")]
    Closed,
}
