//! WRP address grammar: `scheme:authority[/service[/ignored]]`.
//!
//! Mirrors the hand-rolled parse style of the wire envelope in
//! [`crate::codec`] rather than pulling in a URL/URI crate: the grammar is
//! small and deliberately looser than RFC 3986 (no percent-decoding, no
//! query/fragment).

use crate::error::WrpError;

/// A parsed WRP address.
///
/// `scheme` is always lowercased; `authority` is required and verbatim;
/// `service` and `ignored` are the optional path segments after the first
/// two `/`-separated components.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locator {
    pub scheme: String,
    pub authority: String,
    pub service: Option<String>,
    pub ignored: Option<String>,
}

/// Well-known scheme used for broadcast-style destinations.
pub const SCHEME_EVENT: &str = "event";
/// Well-known scheme substituted with the router's configured self identity.
pub const SCHEME_SELF: &str = "self";

impl Locator {
    /// Parses `scheme:authority[/service[/ignored]]`.
    ///
    /// `scheme` and `authority` must both be non-empty or this returns
    /// [`WrpError::InvalidLocator`].
    pub fn parse(input: &str) -> Result<Self, WrpError> {
        let (scheme, rest) = input.split_once(':').ok_or_else(|| WrpError::InvalidLocator {
            input: input.to_string(),
        })?;
        if scheme.is_empty() {
            return Err(WrpError::InvalidLocator {
                input: input.to_string(),
            });
        }

        let scheme = scheme.to_lowercase();
        let mut segments = rest.splitn(3, '/');
        let authority = segments.next().unwrap_or_default();
        // `self:` locators are resolved against the router's configured
        // identity (§4.2 step 1c) and so carry no authority of their own —
        // `self:/svc` is the canonical "self, service svc" address.
        if authority.is_empty() && scheme != SCHEME_SELF {
            return Err(WrpError::InvalidLocator {
                input: input.to_string(),
            });
        }
        let service = segments.next().map(str::to_string);
        let ignored = segments.next().map(str::to_string);

        Ok(Self {
            scheme,
            authority: authority.to_string(),
            service,
            ignored,
        })
    }

    /// Whether this locator's identity (`scheme:authority`) matches another's.
    pub fn identity_eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme && self.authority == other.authority
    }

    pub fn is_event(&self) -> bool {
        self.scheme == SCHEME_EVENT
    }

    pub fn is_self(&self) -> bool {
        self.scheme == SCHEME_SELF
    }

    /// Returns a copy of `self` with its scheme/authority replaced by
    /// `identity`'s, keeping the original `service`/`ignored` segments.
    /// Used by the router's normalization step (§4.2 step 1c) to resolve
    /// `self:` locators to the concrete self identity.
    pub fn substitute_identity(&self, identity: &Self) -> Self {
        Self {
            scheme: identity.scheme.clone(),
            authority: identity.authority.clone(),
            service: self.service.clone(),
            ignored: self.ignored.clone(),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.scheme, self.authority)?;
        if let Some(service) = &self.service {
            write!(f, "/{service}")?;
            if let Some(ignored) = &self.ignored {
                write!(f, "/{ignored}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_and_authority() {
        let loc = Locator::parse("mac:112233445566").expect("parse");
        assert_eq!(loc.scheme, "mac");
        assert_eq!(loc.authority, "112233445566");
        assert_eq!(loc.service, None);
        assert_eq!(loc.ignored, None);
    }

    #[test]
    fn parses_service_and_ignored() {
        let loc = Locator::parse("event:event_1/x/trailing").expect("parse");
        assert_eq!(loc.scheme, "event");
        assert_eq!(loc.authority, "event_1");
        assert_eq!(loc.service.as_deref(), Some("x"));
        assert_eq!(loc.ignored.as_deref(), Some("trailing"));
    }

    #[test]
    fn lowercases_scheme_only() {
        let loc = Locator::parse("MAC:AABBCC").expect("parse");
        assert_eq!(loc.scheme, "mac");
        assert_eq!(loc.authority, "AABBCC");
    }

    #[test]
    fn rejects_empty_scheme() {
        assert!(matches!(
            Locator::parse(":authority"),
            Err(WrpError::InvalidLocator { .. })
        ));
    }

    #[test]
    fn rejects_empty_authority() {
        assert!(matches!(
            Locator::parse("mac:"),
            Err(WrpError::InvalidLocator { .. })
        ));
    }

    #[test]
    fn rejects_missing_colon() {
        assert!(matches!(
            Locator::parse("no-colon-here"),
            Err(WrpError::InvalidLocator { .. })
        ));
    }

    #[test]
    fn self_scheme_allows_empty_authority() {
        let loc = Locator::parse("self:/svc").expect("parse");
        assert_eq!(loc.scheme, "self");
        assert_eq!(loc.authority, "");
        assert_eq!(loc.service.as_deref(), Some("svc"));
    }

    #[test]
    fn substitute_identity_keeps_service_segment() {
        let self_identity = Locator::parse("mac:112233445566").expect("parse");
        let addressed = Locator::parse("self:/svc").expect("parse");
        let resolved = addressed.substitute_identity(&self_identity);
        assert_eq!(resolved.to_string(), "mac:112233445566/svc");
    }

    #[test]
    fn identity_eq_ignores_service() {
        let a = Locator::parse("mac:112233445566/svc-a").expect("parse");
        let b = Locator::parse("mac:112233445566/svc-b").expect("parse");
        assert!(a.identity_eq(&b));
    }
}
