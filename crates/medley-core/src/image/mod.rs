//! Image engine: pixel features, principal subspace and distance index

pub mod extract;
pub mod index;
pub mod pca;

pub use extract::{ImageDataset, ImageExtractor};
pub use index::ImageIndex;
pub use pca::SubspaceModel;
