pub mod convert;
pub mod decode;
pub mod document;
pub mod layout;
mod options;
mod types;

pub use convert::{
    ConversionEvent, ConversionReport, ConversionRequest, DEFAULT_FILE_NAME, SkippedImage,
    convert_images, normalize_display_name, output_file_name,
};
pub use decode::{DecodedImage, EncodedImage, ImageSource, decode_image, load_image};
pub use document::{LopdfBackend, PdfBackend, save_pdf};
pub use layout::{ImageDimensions, PagePlan, PageSpec, Placement, compute_placement};
pub use options::*;
pub use types::*;
