pub mod event;
pub mod progression;
pub mod spawn;
pub mod step;
pub mod world;
