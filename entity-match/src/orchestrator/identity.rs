//! Identity keys for deduplicating company records across sources.
//!
//! A record's identity is its normalized website domain when it has one,
//! otherwise the first 20 alphanumeric characters of its lower-cased name.
//!
//! Two records are the same entity when:
//!
//! 1. both carry a domain and the domains are equal; or
//! 2. at least one has no domain and their name keys are equal; or
//! 3. at least one has no domain and the name key of one equals the
//!    registrable label of the other's domain (`techcorp.com` ↔ `TechCorp`).

use url::Url;

use crate::types::CandidateRecord;

/// Maximum name-key length in characters.
const NAME_KEY_LEN: usize = 20;

/// Normalize a website into a bare, lower-cased host.
///
/// Applies the following transformations:
///
/// 1. Trim and lowercase.
/// 2. Assume `https://` when no scheme is given.
/// 3. Keep only the host (drop scheme, port, path, query, fragment).
/// 4. Strip a leading `www.`.
///
/// Returns `None` for blank input. Input the `url` crate cannot parse is
/// kept lower-cased with any scheme prefix and trailing slashes removed.
///
/// # Examples
///
/// ```
/// use entity_match::orchestrator::identity::normalize_website;
///
/// assert_eq!(normalize_website("https://www.TechCorp.com/about").as_deref(), Some("techcorp.com"));
/// assert_eq!(normalize_website("TechCorp.com").as_deref(), Some("techcorp.com"));
/// ```
pub fn normalize_website(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    let with_scheme = if lowered.contains("://") {
        lowered.clone()
    } else {
        format!("https://{lowered}")
    };

    let host = match Url::parse(&with_scheme) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_string(),
            None => fallback_host(&lowered),
        },
        Err(_) => fallback_host(&lowered),
    };

    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

fn fallback_host(lowered: &str) -> String {
    let without_scheme = lowered
        .split_once("://")
        .map_or(lowered, |(_, rest)| rest);
    without_scheme.trim_end_matches('/').to_string()
}

/// Lower-cased alphanumeric prefix of a name, at most 20 characters.
pub fn name_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_alphanumeric())
        .take(NAME_KEY_LEN)
        .collect()
}

/// The comparable identity of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    domain: Option<String>,
    name: String,
    /// Name key of the domain's first label, e.g. `techcorp` for
    /// `techcorp.com.br`.
    domain_label: Option<String>,
}

impl IdentityKey {
    pub fn of(record: &CandidateRecord) -> Self {
        let domain = record.website.as_deref().and_then(normalize_website);
        let domain_label = domain
            .as_deref()
            .and_then(|d| d.split('.').next())
            .map(name_key)
            .filter(|label| !label.is_empty());
        Self {
            name: name_key(&record.name),
            domain,
            domain_label,
        }
    }

    /// Whether both keys denote the same entity.
    pub fn same_entity(&self, other: &IdentityKey) -> bool {
        if let (Some(a), Some(b)) = (&self.domain, &other.domain) {
            return a == b;
        }
        if !self.name.is_empty() && self.name == other.name {
            return true;
        }
        let label_matches =
            |label: &Option<String>, name: &str| label.as_deref().is_some_and(|l| l == name);
        label_matches(&self.domain_label, &other.name)
            || label_matches(&other.domain_label, &self.name)
    }

    /// Primary key in `domain:…` / `name:…` form, for logging.
    pub fn primary(&self) -> String {
        match &self.domain {
            Some(domain) => format!("domain:{domain}"),
            None => format!("name:{}", self.name),
        }
    }
}
