//! CLI command implementations.

pub(crate) mod dates;
pub(crate) mod download;
pub(crate) mod inspect;
pub(crate) mod plan;
