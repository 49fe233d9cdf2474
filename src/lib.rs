//! Vulkan Registry Tables
//!
//! Reads the Vulkan XML registry (plus the video registry) and derives the
//! deterministic cross-reference tables a capture/replay code generator
//! needs: which commands exist for the target API, which call chain each
//! belongs to, which create or destroy objects, which follow the
//! query-twice contract, and which parameters need external synchronization.
//!
//! ## Features
//!
//! - **Typed Registry Tree**: XML is parsed once into owned nodes
//! - **Deterministic Output**: every table iterates in first-seen order
//! - **Vendor Filtering**: vendor-only symbols are excluded with an explicit allow-list
//! - **Fatal Consistency Checks**: inconsistent input aborts the run, never yields partial tables
//!
//! ## Architecture
//!
//! ```text
//! registry/      XML -> RegistryDocument
//! analysis/
//! ├── collect    valid symbol sets
//! ├── types      structures, handles, storage
//! ├── commands   scopes, lifecycle, query-twice, externsync
//! ├── params     parameter descriptors and renderings
//! ├── handles    handle parent graph
//! └── rules      curated tables and heuristics
//! ```

pub mod analysis;
pub mod checksum;
pub mod config;
pub mod error;
pub mod feature_detect;
pub mod filter;
pub mod ordered;
pub mod registry;
pub mod version;

pub use analysis::{analyze, analyze_from_config, AnalysisOptions, RegistryTables};
pub use checksum::TableDigest;
pub use config::AnalysisConfig;
pub use error::{RegistryError, Result};
pub use feature_detect::FeatureDetectList;
pub use filter::VendorFilter;
pub use ordered::{OrderedMap, OrderedSet};
pub use registry::RegistryDocument;
pub use version::ApiVersion;
