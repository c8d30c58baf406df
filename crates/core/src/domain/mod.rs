pub mod company;
pub mod offer;
pub mod product;
pub mod settings;
