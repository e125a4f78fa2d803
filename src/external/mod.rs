pub mod client;
pub mod google;
pub mod http_transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{HttpClientConfig, build_http_client};
pub use google::{
    DEFAULT_TOKEN_URI, FIREBASE_MESSAGING_SCOPE, ServiceAccountError, ServiceAccountKey,
    ServiceAccountSource, fcm_endpoint,
};
pub use http_transport::ReqwestTransport;
