pub mod day_heading;
pub mod item_line;
pub mod itinerary_parser;
pub mod itinerary_serializer;
pub mod normalize;
pub mod poi_chain;

pub use day_heading::{DayHeading, HeadingDialect, find_day_marker, parse_day_heading};
pub use item_line::{ItemLineError, parse_item_row};
pub use itinerary_parser::{GrammarError, ParsedItinerary, parse_itinerary};
pub use itinerary_serializer::render;
pub use poi_chain::{split_location_list, split_poi_chain};
