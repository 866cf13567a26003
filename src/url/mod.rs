//! URL handling module for Sumi-Mirror
//!
//! This module provides:
//! - Start URL normalization (scheme defaulting, fragment removal)
//! - Reference resolution against the page a reference was found on
//! - The base domain gate that separates internal from external URLs

mod domain;
mod normalize;

pub use domain::{extract_domain, BaseDomain};
pub use normalize::{
    is_fetchable, is_non_navigable, normalize_start_url, resolve_reference, ResolvedReference,
};
