/// A basic error type, essentially a wrapper on a message string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericError(String);

/// A type alias for a result with [`GenericError`].
pub type GenericResult<T> = Result<T, GenericError>;

impl std::fmt::Display for GenericError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for GenericError {}

impl From<String> for GenericError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl<'a> From<&'a str> for GenericError {
    fn from(message: &'a str) -> Self {
        Self(message.to_string())
    }
}

impl From<std::io::Error> for GenericError {
    fn from(error: std::io::Error) -> Self {
        Self(error.to_string())
    }
}
