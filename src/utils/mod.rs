pub mod stream_url_utils;

pub use stream_url_utils::*;
