pub mod events;
pub mod fluid;
pub mod terrain;
pub mod village;
pub mod world;
