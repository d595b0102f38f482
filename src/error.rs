use thiserror::Error;

/// Irregularities in raw backend payloads.
///
/// These never cross the model boundary: the dispatcher logs the error and
/// drops the offending event.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("chat payload is not an object")]
    NotAnObject,
    #[error("chat payload has no usable id")]
    MissingChatId,
}
