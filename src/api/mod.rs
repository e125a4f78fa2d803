//! HTTP API layer: handlers, middleware, DTOs and the router.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;

#[cfg(test)]
pub(crate) mod testing;
