use ammonia::{Builder, UrlRelative};

/// Final HTML-safety stage. Runs on every entry, whatever produced its content.
///
/// Implementations must be total and idempotent: sanitizing already-sanitized
/// content returns it unchanged.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, url: &str, content: &str) -> String;
}

/// Default [`Sanitizer`] backed by ammonia's allow-list.
///
/// Relative links and image sources are resolved against the entry URL when it
/// parses, and every link gets `rel="noopener noreferrer"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmmoniaSanitizer;

impl Sanitizer for AmmoniaSanitizer {
    fn sanitize(&self, url: &str, content: &str) -> String {
        let mut builder = Builder::default();
        builder.link_rel(Some("noopener noreferrer"));

        match ammonia::Url::parse(url) {
            Ok(base) => {
                builder.url_relative(UrlRelative::RewriteWithBase(base));
            }
            Err(_) => {
                // Nothing to resolve against
                builder.url_relative(UrlRelative::Deny);
            }
        }

        builder.clean(content).to_string()
    }
}
