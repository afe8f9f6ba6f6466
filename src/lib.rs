//! Emberdeep - turn-based battle core for a hub-and-dungeon RPG

pub mod battle;
pub mod core;
