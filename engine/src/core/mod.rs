//! Core spatial pipeline
//!
//! Big-number coordinates, the floating-origin camera and the entities that live in big space.

pub mod camera;
pub mod coordinates;
pub mod entity;
