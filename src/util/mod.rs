//! Utility functions for common operations.
//!
//! - **URL validation**: Security-focused validation to prevent SSRF attacks
//!   when the scraper follows entry URLs taken from untrusted feeds
//!
//! # Examples
//!
//! ```
//! use fulltext::util::validate_url;
//!
//! let url = validate_url("https://example.com/posts/1").unwrap();
//! assert_eq!(url.host_str(), Some("example.com"));
//! ```

mod url_validator;

pub use url_validator::{validate_url, UrlValidationError};
