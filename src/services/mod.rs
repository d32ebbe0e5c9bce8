pub mod analysis;
pub mod categorization;
pub mod chat;
pub mod collection_value;
pub mod openid;
pub mod providers;
pub mod recommendations;

pub use chat::ChatAssistant;
pub use collection_value::{estimate_collection_value, PriceLookupSettings};
pub use openid::SteamOpenId;
pub use recommendations::RecommendationEngine;
