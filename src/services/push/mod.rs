//! Push-notification dispatch core.
//!
//! Leaves first: [`CredentialCache`] and [`MessageBuilder`], then the
//! [`Dispatcher`] that drives them together with the two external
//! collaborators, [`RecipientResolver`] and [`Transport`].

mod credential;
mod dispatcher;
mod message;
mod outcome;
mod request;
mod resolver;
mod retry;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use credential::{
    BearerCredential, CacheOptions, CredentialCache, CredentialError, CredentialSource,
    StaticTokenSource,
};
pub use dispatcher::{DEFAULT_SEND_TIMEOUT, Dispatcher, DispatcherBuildError, DispatcherBuilder};
pub use message::{MessageBuilder, MessageTemplate, ValidationError, WireMessage};
pub use outcome::{AuthFailureCause, LOCAL_VALIDATION_STATUS, RetryClass, SendOutcome};
pub use request::{DeviceToken, NotificationRequest, RequestError};
pub use resolver::{RecipientResolver, ResolveError, StaticRecipientResolver};
pub use retry::{RetryPolicy, send_with_retry};
pub use transport::{Transport, TransportError, TransportRequest, TransportResponse};
