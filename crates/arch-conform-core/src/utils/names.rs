//! Helpers for dotted, fully-qualified type and package names.

/// Returns the package part of a fully-qualified type name.
///
/// ```
/// use arch_conform_core::utils::package_of;
///
/// assert_eq!(package_of("com.example.Outer$Inner"), "com.example");
/// assert_eq!(package_of("Main"), "");
/// ```
#[must_use]
pub fn package_of(type_name: &str) -> &str {
    type_name.rfind('.').map_or("", |i| &type_name[..i])
}

/// Returns the simple name of a fully-qualified type name, with nesting
/// (`$`) stripped.
#[must_use]
pub fn simple_name(type_name: &str) -> &str {
    let unqualified = type_name.rfind('.').map_or(type_name, |i| &type_name[i + 1..]);
    unqualified
        .rfind('$')
        .map_or(unqualified, |i| &unqualified[i + 1..])
}

/// Checks whether `package` equals `root` or is one of its sub-packages.
#[must_use]
pub fn is_in_package_tree(package: &str, root: &str) -> bool {
    if root.is_empty() {
        return true;
    }
    package == root
        || package
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Checks if a package name matches a pattern.
///
/// Supports wildcards:
/// - `*` matches any single segment
/// - `**` matches any number of segments
///
/// # Examples
///
/// ```
/// use arch_conform_core::utils::package_matches;
///
/// assert!(package_matches("com.example.web", "com.example.*"));
/// assert!(package_matches("com.example.web.api", "com.**"));
/// assert!(!package_matches("com.example.web", "org.*"));
/// ```
#[must_use]
pub fn package_matches(package: &str, pattern: &str) -> bool {
    let package_parts: Vec<&str> = if package.is_empty() {
        Vec::new()
    } else {
        package.split('.').collect()
    };
    let pattern_parts: Vec<&str> = pattern.split('.').collect();

    match_parts(&package_parts, &pattern_parts)
}

fn match_parts(package: &[&str], pattern: &[&str]) -> bool {
    let Some((first, rest)) = pattern.split_first() else {
        return package.is_empty();
    };

    match *first {
        "**" => (0..=package.len()).any(|i| match_parts(&package[i..], rest)),
        "*" => !package.is_empty() && match_parts(&package[1..], rest),
        literal => package.first() == Some(&literal) && match_parts(&package[1..], rest),
    }
}
