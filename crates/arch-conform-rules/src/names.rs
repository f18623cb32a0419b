//! Default rule names derived from annotation names.

use arch_conform_core::utils::simple_name;

/// Kebab-case slug of an annotation's simple name, e.g.
/// `org.example.EnableRetry` becomes `enable-retry`.
pub(crate) fn slug(annotation: &str) -> String {
    let mut out = String::new();
    let mut previous_lower = false;
    for c in simple_name(annotation).chars() {
        if c.is_ascii_uppercase() {
            if previous_lower {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            previous_lower = false;
        } else {
            out.push(c);
            previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// `@Simple` form of an annotation name for messages.
pub(crate) fn at(annotation: &str) -> String {
    format!("@{}", simple_name(annotation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_splits_camel_case() {
        assert_eq!(slug("org.example.EnableRetry"), "enable-retry");
        assert_eq!(slug("Async"), "async");
        assert_eq!(slug("fw.HTTPExchange"), "httpexchange");
        assert_eq!(slug("fw.Outer$CacheEvict2"), "cache-evict2");
    }

    #[test]
    fn at_uses_simple_name() {
        assert_eq!(at("org.example.Retryable"), "@Retryable");
    }
}
