use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    #[snafu(display("key-value storage is unavailable on `{stage}`: {details}"))]
    Unavailable {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("failed to read storage key '{key}': {details}"))]
    ReadKey {
        stage: &'static str,
        key: String,
        details: String,
    },
    #[snafu(display("failed to write storage key '{key}': {details}"))]
    WriteKey {
        stage: &'static str,
        key: String,
        details: String,
    },
    #[snafu(display("failed to remove storage key '{key}': {details}"))]
    RemoveKey {
        stage: &'static str,
        key: String,
        details: String,
    },
    #[snafu(display("failed to serialize transcript on `{stage}`: {source}"))]
    SerializeTranscript {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("stored transcript under '{key}' is malformed: {source}"))]
    ParseTranscript {
        stage: &'static str,
        key: String,
        source: serde_json::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;
