use super::FacadeError;
use crate::repo;

/// Opens the document store identified by `uri`.
///
/// Every failure is reported as [`FacadeError::ConnectionError`], no retry is attempted.
pub async fn connect(uri: &str) -> Result<repo::Repository, FacadeError> {
    repo::Repository::connect(uri)
        .await
        .map_err(FacadeError::ConnectionError)
}

/// Closes the document store. Safe to call more than once.
pub async fn disconnect(repo: &repo::Repository) {
    repo.disconnect().await;
}
