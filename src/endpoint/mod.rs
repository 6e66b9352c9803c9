//! # Endpoint Module
//!
//! Declarations ([`EndpointDescriptor`], [`ParamDecl`], [`FileDecl`]) and the
//! immutable, normalized records ([`Endpoint`], [`ParameterSpec`], [`FileSpec`])
//! a router keeps for its lifetime.

pub mod normalize;
mod types;

pub use normalize::{endpoint_name, normalize, RESERVED_FIELDS};
pub use types::{
    Endpoint, EndpointDescriptor, Enctype, FileDecl, FileSpec, ParamDecl, ParameterSpec,
    Transform, SUPPORTED_METHODS,
};
