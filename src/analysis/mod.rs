pub mod confidence;
pub mod enrich;
pub mod risk;
pub mod statistics;
