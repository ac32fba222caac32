pub mod image;
pub mod keypoint;
pub mod point;
pub mod robust;
pub mod runtime;

pub use self::image::*;
pub use keypoint::*;
pub use point::*;
pub use robust::*;
pub use runtime::*;
