pub mod data_url;
pub mod file_extractor;

pub use data_url::{DataUrl, DataUrlError};
pub use file_extractor::{
    ConfigFileExtractor, ExtractionMode, ExtractionOutcome, ExtractionProgress, ExtractionRequest,
};
