pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    Tensor(edgetrack_tensor::Error),
    Decoder(edgetrack_decoder::Error),
    Tracker(edgetrack_tracker::Error),
    Yaml(serde_yaml::Error),
    Json(serde_json::Error),
}

impl From<edgetrack_tensor::Error> for Error {
    fn from(err: edgetrack_tensor::Error) -> Self {
        Error::Tensor(err)
    }
}

impl From<edgetrack_decoder::Error> for Error {
    fn from(err: edgetrack_decoder::Error) -> Self {
        Error::Decoder(err)
    }
}

impl From<edgetrack_tracker::Error> for Error {
    fn from(err: edgetrack_tracker::Error) -> Self {
        Error::Tracker(err)
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
            Error::Tensor(e) => write!(f, "tensor error: {}", e),
            Error::Decoder(e) => write!(f, "decoder error: {}", e),
            Error::Tracker(e) => write!(f, "tracker error: {}", e),
            Error::Yaml(e) => write!(f, "YAML error: {}", e),
            Error::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for Error {}
