pub mod best_price;
pub mod matcher;

pub use best_price::Recommender;
