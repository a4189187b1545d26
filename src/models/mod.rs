pub mod buffer;
pub mod decoded;
pub mod point;
pub mod region;

pub use buffer::{ColorImage, LumaImage};
pub use decoded::{CodeSource, DecodedCode};
pub use point::{Corners, Point};
pub use region::{Rect, Region, RegionKind};
