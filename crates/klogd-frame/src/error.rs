/// Errors that can occur while setting up frame processing.
///
/// Processing itself has no failure path: any byte sequence is valid input.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The carry buffer cannot hold even one byte per read.
    #[error("buffer capacity too small ({capacity} bytes, min {min})")]
    CapacityTooSmall { capacity: usize, min: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
