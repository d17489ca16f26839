pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    Config(String),
    ValueDomain(String),
    InvalidShape(String),
    Tensor(edgetrack_tensor::Error),
    Yaml(serde_yaml::Error),
    Json(serde_json::Error),
}

impl From<edgetrack_tensor::Error> for Error {
    fn from(err: edgetrack_tensor::Error) -> Self {
        Error::Tensor(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::ValueDomain(msg) => write!(f, "value domain error: {}", msg),
            Error::InvalidShape(msg) => write!(f, "invalid shape: {}", msg),
            Error::Tensor(e) => write!(f, "tensor error: {}", e),
            Error::Yaml(e) => write!(f, "yaml error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for Error {}
