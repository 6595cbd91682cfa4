// Entity state store and the adapter seam consumed by the change tracker

mod entity;
mod store;

pub use entity::{Entity, EntitySnapshot, StateChanged, ATTR_FRIENDLY_NAME};
pub use store::{EntityStore, StateStore, Transition};

#[cfg(test)]
mod tests;
