//! Hostname splitting for displayable links.

use thiserror::Error;

/// Known multi-part TLDs.
const MULTI_PART_TLDS: &[&str] = &[
    "co.uk", "co.in", "com.au", "au.uk", "co.nz", "co.jp", "co.kr", "com.br", "com.cn",
];

#[derive(Debug, Error)]
pub enum UrlParseError {
    #[error("invalid hostname format")]
    InvalidHostname,
}

/// Parsed components of a URL's hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub domain: String,
    pub tld: String,
    pub subdomain: String,
}

impl UrlParts {
    /// The domain and TLD combined (e.g. "example.com").
    pub fn full_domain(&self) -> String {
        format!("{}.{}", self.domain, self.tld)
    }
}

/// Extract domain, TLD and subdomain from a URL string. A missing scheme is
/// tolerated; "www" is never reported as a subdomain.
pub fn parse(url: &str) -> Result<UrlParts, UrlParseError> {
    let host = hostname(url);
    if host.is_empty() {
        return Err(UrlParseError::InvalidHostname);
    }

    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() < 2 {
        return Err(UrlParseError::InvalidHostname);
    }

    if let Some(tld) = multi_part_tld(&parts) {
        let rest = &parts[..parts.len() - 2];
        match rest.len() {
            0 => Err(UrlParseError::InvalidHostname),
            1 => Ok(UrlParts {
                domain: rest[0].to_string(),
                tld,
                subdomain: String::new(),
            }),
            _ => {
                // The last remaining part is the domain.
                let domain = rest[rest.len() - 1].to_string();
                let subdomain_parts = &rest[..rest.len() - 1];
                let subdomain = if subdomain_parts[0] == "www" {
                    subdomain_parts[1..].join(".")
                } else {
                    subdomain_parts.join(".")
                };
                Ok(UrlParts {
                    domain,
                    tld,
                    subdomain,
                })
            }
        }
    } else {
        let tld = parts[parts.len() - 1].to_string();
        match parts.len() {
            2 => Ok(UrlParts {
                domain: parts[0].to_string(),
                tld,
                subdomain: String::new(),
            }),
            3 => {
                if parts[0] == "www" {
                    Ok(UrlParts {
                        domain: parts[1].to_string(),
                        tld,
                        subdomain: String::new(),
                    })
                } else {
                    Ok(UrlParts {
                        domain: parts[1].to_string(),
                        tld,
                        subdomain: parts[0].to_string(),
                    })
                }
            }
            _ => {
                let domain = parts[parts.len() - 2].to_string();
                let subdomain = if parts[0] == "www" {
                    parts[1..parts.len() - 2].join(".")
                } else {
                    parts[..parts.len() - 2].join(".")
                };
                Ok(UrlParts {
                    domain,
                    tld,
                    subdomain,
                })
            }
        }
    }
}

/// Strip scheme, path, query, userinfo and port down to the bare hostname.
fn hostname(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(rest);
    let rest = rest.rsplit('@').next().unwrap_or(rest);
    rest.split(':').next().unwrap_or(rest)
}

/// Do the last two host parts form a known multi-part TLD?
fn multi_part_tld(parts: &[&str]) -> Option<String> {
    if parts.len() < 2 {
        return None;
    }
    let candidate = format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);
    MULTI_PART_TLDS
        .contains(&candidate.as_str())
        .then_some(candidate)
}
