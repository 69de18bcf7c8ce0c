use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Peer channel closed")]
    ChannelClosed,
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl From<bincode::Error> for NetworkError {
    fn from(err: bincode::Error) -> Self {
        NetworkError::Codec(err.to_string())
    }
}
