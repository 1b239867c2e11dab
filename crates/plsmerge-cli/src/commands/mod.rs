pub mod merge;
pub mod scan;
pub mod ssml;
