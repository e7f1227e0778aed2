use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// A partition store cannot fit its in-memory index or tail cache.
    CapacityExceeded,
    /// A partition filename does not have the expected shape.
    MalformedName(String),
    Corrupt(&'static str),
    /// A parallel lookup worker went away before delivering its result.
    Interrupted,
    Closed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::CapacityExceeded => write!(f, "partition store capacity exceeded"),
            Error::MalformedName(name) => write!(f, "malformed partition filename: {name}"),
            Error::Corrupt(msg) => write!(f, "corrupt data: {msg}"),
            Error::Interrupted => write!(f, "parallel lookup interrupted"),
            Error::Closed => write!(f, "split table is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
