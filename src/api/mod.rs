pub mod api_football;
pub mod football_data;

pub use api_football::ApiFootballClient;
pub use football_data::FootballDataClient;
