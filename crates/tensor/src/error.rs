pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    ShapeVolumeMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ShapeVolumeMismatch { expected, actual } => {
                write!(
                    f,
                    "shape volume mismatch: expected {} elements, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for Error {}
