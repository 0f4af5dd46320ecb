pub mod clock;
pub mod engine;
pub mod options;
pub mod surface;
