pub mod delivery;
pub mod driver;
pub mod event;
pub mod order;
pub mod settings;
pub mod shift;
