mod http;

pub use http::HttpRemoteStore;
