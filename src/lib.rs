// Library exports for testing
pub mod aggregate;
pub mod archive;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod progress;
pub mod renderer;
pub mod report;
pub mod timefmt;
