//! API handlers module

pub mod categories;
pub mod events;
pub mod health;
pub mod imports;
pub mod leads;
