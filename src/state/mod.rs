pub mod price_store;

pub use price_store::{MemoryPriceStore, PriceStore};
