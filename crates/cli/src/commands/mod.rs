pub mod basket;
pub mod images;
pub mod select;
