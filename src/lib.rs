//! OPRA Mailer: drafts a cover email for a records request and sends it
//! to the municipal clerk with the request form attached.

pub mod app;
pub mod config;
pub mod delivery;
pub mod draft;
pub mod error;
pub mod extract;
pub mod llm;
pub mod request;
pub mod routes;
