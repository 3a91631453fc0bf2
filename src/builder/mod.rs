//! Template creation: card dimensions, artwork staging and the two-phase submit.

pub mod sizes;
pub mod staging;
pub mod wizard;
