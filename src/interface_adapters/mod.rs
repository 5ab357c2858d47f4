// Interface adapters: store wire format, HTTP client, realtime feed and renderers.

pub mod clients;
pub mod net;
pub mod protocol;
pub mod render;
pub mod utils;
