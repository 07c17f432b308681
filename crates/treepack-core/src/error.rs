use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreePackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid page dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Nothing to pack")]
    Empty,
    #[error("Duplicate image key: {0}")]
    DuplicateKey(String),
    #[error("Image {0} does not fit into an empty page")]
    PlacementExhausted(String),
    #[error("Pixels of {key} overflow the page canvas at ({x}, {y})")]
    Blit { key: String, x: u32, y: u32 },
    #[error("Encoding error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, TreePackError>;
