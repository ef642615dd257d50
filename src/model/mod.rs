pub mod category;
pub mod clock;
pub mod config;
pub mod itinerary;

pub use category::*;
pub use clock::*;
pub use config::*;
pub use itinerary::*;
