//! OpenAPI/Swagger loading and normalization

#[cfg(feature = "enhanced")]
pub mod enhanced;
pub mod loader;
pub mod minimal;
pub mod model;
pub mod normalize;
pub mod refs;

#[cfg(feature = "enhanced")]
pub use enhanced::EnhancedNormalizer;
pub use loader::{load, RawDocument, SpecFormat};
pub use minimal::MinimalNormalizer;
pub use model::{
    ApiKeyLocation, Capability, Endpoint, ParamLocation, Parameter, RequestBodySpec,
    SecurityRequirement, SecurityScheme, Specification, TypeHint,
};
pub use normalize::{select_normalizer, Normalizer};
