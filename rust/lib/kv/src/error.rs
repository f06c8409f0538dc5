use thiserror::Error;

#[derive(Error, Debug)]
pub enum KVError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("value for key {key} is not valid UTF-8")]
    Encoding { key: String },
}
