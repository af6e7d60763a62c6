use thiserror::Error;

/// Failure reported by the data-access collaborator.
///
/// Never crosses the viewer boundary: the component that issued the call
/// folds it into a zero state or reverts its optimistic change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("network: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("not authenticated")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("decode: {0}")]
    Decode(String),
}

/// Viewer operations that cannot proceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    /// An empty catalog must not be opened.
    #[error("catalog has no active stories")]
    EmptyCatalog,

    #[error("viewer is not open")]
    NotOpen,

    #[error(transparent)]
    Comment(#[from] CommentRejected),
}

/// Local rejection of a comment submission. No request is sent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentRejected {
    #[error("comment body is empty")]
    EmptyBody,

    #[error("sign in to comment")]
    Unauthenticated,

    #[error("a comment is already being sent")]
    Busy,

    #[error("no story is active")]
    NoActiveStory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(BackendError::Network("reset".into()).to_string(), "network: reset");
        assert_eq!(
            BackendError::Server { status: 503, message: "busy".into() }.to_string(),
            "HTTP 503: busy"
        );
        assert_eq!(ViewerError::EmptyCatalog.to_string(), "catalog has no active stories");
        assert_eq!(CommentRejected::EmptyBody.to_string(), "comment body is empty");
        assert_eq!(
            ViewerError::from(CommentRejected::Busy).to_string(),
            "a comment is already being sent"
        );
    }
}
