mod credential;
mod event;
mod image;
mod pipeline;

pub use credential::*;
pub use event::*;
pub use image::*;
pub use pipeline::*;
