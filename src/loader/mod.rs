pub mod artifacts;
pub mod forge;
pub mod solc_ast;
pub mod source_map;

pub use artifacts::{find_ast_files, find_source_files, load_document, LoadedDocument};
pub use source_map::{offset_to_line_col, src_to_location, SourceLocation};
