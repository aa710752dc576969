// Trawl - typed search requests and scroll streaming for OpenSearch
//
// This library builds validated request documents, decodes responses and
// walks large result sets through scroll cursors.

// Re-export the search client and DSL
pub use trawl_search::*;

// Re-export logging
pub use trawl_log;

/// Prelude for common imports.
pub mod prelude {
    pub use trawl_search::prelude::*;
}
