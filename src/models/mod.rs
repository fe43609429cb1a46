use serde::{Deserialize, Serialize};

pub mod change;
pub mod product;
pub mod summary;

// Re-exports for convenience
pub use change::*;
pub use product::*;
pub use summary::*;

/// Stock availability derived from a fetched page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StockState {
    InStock,
    OutOfStock,
}

impl std::fmt::Display for StockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockState::InStock => write!(f, "InStock"),
            StockState::OutOfStock => write!(f, "OutOfStock"),
        }
    }
}
