pub mod commons_auth;
pub mod file_service;
pub mod source_resolver;
pub mod wikisource;
