pub mod markup;
pub mod numeric;
pub mod structured;

pub use markup::MarkupFeatureExtractor;
pub use structured::StructuredNormalizer;
