//! Backend feature flags reported to the ORM.

use ibmdb::{Dialect, Feature};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct DatabaseFeatures {
    /// Results must be fully read before another statement runs.
    pub can_use_chunked_reads: bool,
    pub uses_savepoints: bool,
    pub uses_custom_query_class: bool,
    pub supports_native_xml: bool,
    pub supports_keyset_cursors: bool,
}

impl DatabaseFeatures {
    #[must_use]
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            can_use_chunked_reads: false,
            uses_savepoints: dialect.supports(Feature::Savepoints),
            uses_custom_query_class: true,
            supports_native_xml: dialect.supports(Feature::NativeXml),
            supports_keyset_cursors: dialect.supports(Feature::KeysetCursors),
        }
    }
}
