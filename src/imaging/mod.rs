//! Image dimension handling. No pixel work happens in this crate.
//!
//! | Concern | Module |
//! |---|---|
//! | **Fit / crop arithmetic** | [`calculations`]: pure functions, unit testable |
//! | **Header sniffing** | [`header`]: PNG/GIF/JPEG size from leading bytes |
//! | **Remote discovery** | [`fetch`]: ranged HTTP GET + header parse, one retry |
//!
//! Actual resizing is done by the nginx image filter behind the rewritten URL.

mod calculations;
pub mod fetch;
pub mod header;

pub use calculations::{ResizeBox, constrain_dimensions, resize_dimensions, scale_to_width};
pub use fetch::{DimensionFetcher, FetchError, HttpClient, HttpResponse, ReqwestClient};
pub use header::{HeaderError, ImageFormat, parse_gif, parse_jpeg, parse_png};
