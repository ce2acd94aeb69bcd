//! Utility functions for common operations.
//!
//! - **URL validation**: refuses non-HTTP schemes and, by default, local or
//!   private hosts before any outbound request
//! - **HTML text helpers**: tag stripping, escaping, and body sanitation
//!
//! # Examples
//!
//! ```
//! use feedpress::util::{escape_html, strip_tags, validate_url, HostPolicy};
//!
//! let url = validate_url("https://example.com/feed.xml", HostPolicy::PublicOnly).unwrap();
//! assert_eq!(strip_tags("<b>Fast</b> tips"), "Fast tips");
//! assert_eq!(escape_html("a & b"), "a &amp; b");
//! ```

mod text;
mod url_validator;

pub use text::{escape_html, sanitize_html, strip_tags};
pub use url_validator::{validate_url, HostPolicy, UrlValidationError};
