mod json;

pub use json::HubJsonCodec;
