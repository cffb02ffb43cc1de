pub mod amount;
pub mod chat;

pub use chat::ChatParser;
