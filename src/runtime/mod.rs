pub mod combat;
pub mod effects;
pub mod inventory;
pub mod movement;
pub mod spatial;
