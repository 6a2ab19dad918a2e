//! Wire-name derivation for contract members.

use std::borrow::Cow;

// -----------------------------------------------------------------------------
// NamingPolicy

/// The policy mapping declared member names to wire names.
///
/// The default is [`CamelCase`](Self::CamelCase), matching the wire contract
/// this bridge reproduces. A member annotated with an explicit rename
/// bypasses the policy entirely.
///
/// # Examples
///
/// ```
/// use polytag::NamingPolicy;
///
/// assert_eq!(NamingPolicy::CamelCase.apply("user_name"), "userName");
/// assert_eq!(NamingPolicy::CamelCase.apply("radius"), "radius");
/// assert_eq!(NamingPolicy::Preserve.apply("user_name"), "user_name");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamingPolicy {
    /// `user_name` stays `user_name`.
    Preserve,
    /// `user_name` becomes `userName`.
    #[default]
    CamelCase,
    /// `userName` becomes `user_name`. Declared names that already are
    /// snake_case pass through unchanged.
    SnakeCase,
}

impl NamingPolicy {
    /// Derives the wire name for a declared member name.
    ///
    /// An empty result is a configuration error; the caller rejects it at
    /// resolve time rather than emitting a nameless property.
    pub fn apply(self, declared: &'static str) -> Cow<'static, str> {
        match self {
            Self::Preserve => Cow::Borrowed(declared),
            Self::CamelCase => camel_case(declared),
            Self::SnakeCase => snake_case(declared),
        }
    }
}

fn camel_case(declared: &'static str) -> Cow<'static, str> {
    if !declared.contains('_') {
        return Cow::Borrowed(declared);
    }

    let mut out = String::with_capacity(declared.len());
    for (i, part) in declared.split('_').filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(part);
        } else {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    Cow::Owned(out)
}

fn snake_case(declared: &'static str) -> Cow<'static, str> {
    if !declared.chars().any(|c| c.is_uppercase()) {
        return Cow::Borrowed(declared);
    }

    let mut out = String::with_capacity(declared.len() + 4);
    for c in declared.chars() {
        if c.is_uppercase() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::NamingPolicy;

    #[test]
    fn camel_case() {
        let policy = NamingPolicy::CamelCase;
        assert_eq!(policy.apply("radius"), "radius");
        assert_eq!(policy.apply("user_name"), "userName");
        assert_eq!(policy.apply("a_b_c"), "aBC");
        // Underscore-only names collapse to nothing; the resolver treats
        // that as a hard configuration error.
        assert_eq!(policy.apply("__"), "");
    }

    #[test]
    fn snake_case() {
        let policy = NamingPolicy::SnakeCase;
        assert_eq!(policy.apply("userName"), "user_name");
        assert_eq!(policy.apply("radius"), "radius");
    }
}
