use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
