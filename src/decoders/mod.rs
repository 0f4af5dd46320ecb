pub mod chunk;
pub mod compositor;
pub(crate) mod filter;
pub mod png;
