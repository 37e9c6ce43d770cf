//! C++ front-end
//!
//! Structure comes from tree-sitter-cpp without compiling anything; behavior
//! comes from g++-compiled probe programs. A submission may span several
//! files, see [`sources`].

pub mod extract;
pub mod gxx;
pub mod probe;
pub mod sources;

pub use extract::{defines_main, extract_into, extract_model, ExtractError};
pub use gxx::{GxxConfig, GxxRuntime};
pub use probe::ProbeOutcome;
pub use sources::{CppSources, SourceError, SourceFile, CPP_EXTENSIONS};
