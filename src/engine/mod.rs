pub mod assignment;
pub mod fees;
pub mod gateway;
pub mod lifecycle;
pub mod ranking;
pub mod roster;
pub mod settings;
pub mod shifts;
