pub mod ai;
pub mod anim;
pub mod entity;
pub mod grid;
pub mod mover;
pub mod tile;
