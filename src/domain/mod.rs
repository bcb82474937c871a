pub mod collision;
pub mod entity;
pub mod rules;
