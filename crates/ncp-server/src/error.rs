use std::fmt;

pub type ServerResult<T> = Result<T, ServerError>;
pub type ServerError = ncp_error::Error<ServerErrorKind>;

#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum ServerErrorKind {
    Bind,
}

impl fmt::Display for ServerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind => write!(f, "failed to bind listener"),
        }
    }
}

impl std::error::Error for ServerErrorKind {}

pub trait ServerErrorExt {
    fn bind(context: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self;
}

impl ServerErrorExt for ServerError {
    fn bind(context: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(context, ServerErrorKind::Bind).with_source(source)
    }
}
