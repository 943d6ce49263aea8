pub mod md;
pub mod svg;
