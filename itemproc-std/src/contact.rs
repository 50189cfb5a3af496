//! Contact details found in scraped text and pages.

use itemproc_macros::processor;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"(?i)[a-z0-9.\-+_]+@[a-z0-9.\-+_]+\.[a-z]+").unwrap();
    static ref LINK: Selector = Selector::parse("a[href]").unwrap();
}

/// Email addresses in a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Emails {
    /// Keep only addresses at this domain or its subdomains.
    pub domain: Option<String>,
    /// Keep only addresses containing this text.
    pub contains: Option<String>,
}

#[processor(crate = itemproc_core, register)]
impl Emails {
    fn process_value(value: String, context: &Self) -> Vec<String> {
        EMAIL
            .find_iter(&value)
            .map(|m| m.as_str())
            .filter(|email| match &context.domain {
                Some(domain) => email
                    .rsplit_once('@')
                    .is_some_and(|(_, host)| host_matches(host, domain)),
                None => true,
            })
            .filter(|email| {
                context
                    .contains
                    .as_deref()
                    .is_none_or(|needle| email.contains(needle))
            })
            .map(str::to_string)
            .collect()
    }
}

/// Social network links of an HTML page, grouped by network domain.
///
/// Every domain in `domains` and `additional_domains` gets an entry, empty
/// when the page does not link to it. Relative links are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Socials {
    /// Network domains to look for.
    pub domains: Vec<String>,
    /// Looked for in addition to `domains`.
    pub additional_domains: Vec<String>,
    /// Keep only links containing this text.
    pub contains: Option<String>,
}

impl Default for Socials {
    fn default() -> Self {
        Self {
            domains: [
                "facebook.com",
                "instagram.com",
                "twitter.com",
                "x.com",
                "linkedin.com",
                "youtube.com",
                "tiktok.com",
                "pinterest.com",
            ]
            .map(String::from)
            .to_vec(),
            additional_domains: Vec::new(),
            contains: None,
        }
    }
}

#[processor(crate = itemproc_core, register)]
impl Socials {
    fn process_value(value: String, context: &Self) -> Map<String, Value> {
        let document = Html::parse_document(&value);
        let links: Vec<Url> = document
            .select(&LINK)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| {
                context
                    .contains
                    .as_deref()
                    .is_none_or(|needle| href.contains(needle))
            })
            .filter_map(|href| Url::parse(href).ok())
            .collect();

        context
            .domains
            .iter()
            .chain(&context.additional_domains)
            .map(|domain| {
                let matching = links
                    .iter()
                    .filter(|link| link.host_str().is_some_and(|host| host_matches(host, domain)))
                    .map(|link| Value::from(link.as_str()))
                    .collect();
                (domain.clone(), Value::Array(matching))
            })
            .collect()
    }
}

/// `host` is `domain` or one of its subdomains.
fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}
