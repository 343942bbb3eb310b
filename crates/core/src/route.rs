//! Request classification as an ordered route table.
//!
//! Each [`Route`] pairs a predicate over the request URL with the strategy
//! and partition that serve it. Routes are evaluated top to bottom and the
//! first match wins:
//!
//! | order | class          | strategy               | partition |
//! |-------|----------------|------------------------|-----------|
//! | 1     | critical shell | cache-first            | primary   |
//! | 2     | static asset   | cache-first            | static    |
//! | 3     | api call       | network-first          | dynamic   |
//! | 4     | image          | cache-first            | static    |
//! | 5     | anything else  | stale-while-revalidate | dynamic   |
//!
//! Only GET requests are routed at all.

use std::collections::HashSet;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Request, config::WorkerConfig};

/// Resource class a request falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    CriticalShell,
    StaticAsset,
    ApiCall,
    Image,
    Default,
}

/// Caching strategy applied to a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

/// Which of the three current partitions a route reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PartitionRole {
    Primary,
    Static,
    Dynamic,
}

impl std::fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceClass::CriticalShell => "critical_shell",
            ResourceClass::StaticAsset => "static_asset",
            ResourceClass::ApiCall => "api_call",
            ResourceClass::Image => "image",
            ResourceClass::Default => "default",
        };
        f.write_str(s)
    }
}

/// URL predicate of a route.
#[derive(Debug, Clone)]
enum Matcher {
    /// Same-origin request whose path is one of the listed paths.
    ShellPaths { origin: String, paths: HashSet<String> },
    /// Path starts with a prefix or matches the pattern.
    PathPrefixOrPattern { prefixes: Vec<String>, pattern: Regex },
    /// Path starts with a prefix or the whole URL starts with an allow-listed prefix.
    PathPrefixOrUrlPrefix { prefixes: Vec<String>, url_prefixes: Vec<String> },
    PathPattern(Regex),
    Any,
}

impl Matcher {
    fn matches(&self, url: &Url) -> bool {
        let path = url.path();
        match self {
            Matcher::ShellPaths { origin, paths } => url.origin().ascii_serialization() == *origin && paths.contains(path),
            Matcher::PathPrefixOrPattern { prefixes, pattern } => {
                prefixes.iter().any(|p| path.starts_with(p.as_str())) || pattern.is_match(path)
            }
            Matcher::PathPrefixOrUrlPrefix { prefixes, url_prefixes } => {
                prefixes.iter().any(|p| path.starts_with(p.as_str()))
                    || url_prefixes.iter().any(|p| url.as_str().starts_with(p.as_str()))
            }
            Matcher::PathPattern(pattern) => pattern.is_match(path),
            Matcher::Any => true,
        }
    }
}

/// A single (predicate, strategy) pair.
#[derive(Debug, Clone)]
pub struct Route {
    pub class: ResourceClass,
    pub strategy: Strategy,
    pub partition: PartitionRole,
    matcher: Matcher,
}

impl Route {
    pub fn matches(&self, url: &Url) -> bool {
        self.matcher.matches(url)
    }
}

/// Ordered routes; the last entry always matches.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build the table from worker settings.
    ///
    /// `origin` scopes the critical shell: only same-origin paths count.
    pub fn from_config(config: &WorkerConfig, origin: &Url) -> Result<Self, Error> {
        let static_pattern = compile(&config.static_asset_pattern, "static_asset_pattern")?;
        let image_pattern = compile(&config.image_extension_pattern, "image_extension_pattern")?;

        let routes = vec![
            Route {
                class: ResourceClass::CriticalShell,
                strategy: Strategy::CacheFirst,
                partition: PartitionRole::Primary,
                matcher: Matcher::ShellPaths {
                    origin: origin.origin().ascii_serialization(),
                    paths: config.critical_shell_resources.iter().cloned().collect(),
                },
            },
            Route {
                class: ResourceClass::StaticAsset,
                strategy: Strategy::CacheFirst,
                partition: PartitionRole::Static,
                matcher: Matcher::PathPrefixOrPattern {
                    prefixes: config.static_asset_prefixes.clone(),
                    pattern: static_pattern,
                },
            },
            Route {
                class: ResourceClass::ApiCall,
                strategy: Strategy::NetworkFirst,
                partition: PartitionRole::Dynamic,
                matcher: Matcher::PathPrefixOrUrlPrefix {
                    prefixes: config.api_path_prefixes.clone(),
                    url_prefixes: config.api_allowlist.clone(),
                },
            },
            Route {
                class: ResourceClass::Image,
                strategy: Strategy::CacheFirst,
                partition: PartitionRole::Static,
                matcher: Matcher::PathPattern(image_pattern),
            },
            Route {
                class: ResourceClass::Default,
                strategy: Strategy::StaleWhileRevalidate,
                partition: PartitionRole::Dynamic,
                matcher: Matcher::Any,
            },
        ];

        Ok(Self { routes })
    }

    /// First route matching the request, or `None` when the request is not a GET.
    pub fn route(&self, request: &Request) -> Option<&Route> {
        if !request.is_get() {
            return None;
        }
        self.routes.iter().find(|r| r.matches(&request.url))
    }

    /// Routes in evaluation order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

fn compile(pattern: &str, field: &str) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|e| Error::InvalidInput(format!("{field}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        let config = WorkerConfig {
            api_allowlist: vec!["https://api.y7sauces.com/".into()],
            ..Default::default()
        };
        RouteTable::from_config(&config, &Url::parse("https://y7sauces.com").unwrap()).unwrap()
    }

    fn class_of(table: &RouteTable, url: &str) -> ResourceClass {
        table.route(&Request::get(Url::parse(url).unwrap())).unwrap().class
    }

    #[test]
    fn test_priority_order() {
        let classes: Vec<_> = table().routes().iter().map(|r| r.class).collect();
        assert_eq!(
            classes,
            vec![
                ResourceClass::CriticalShell,
                ResourceClass::StaticAsset,
                ResourceClass::ApiCall,
                ResourceClass::Image,
                ResourceClass::Default,
            ]
        );
    }

    #[test]
    fn test_classify_critical_shell() {
        let t = table();
        assert_eq!(class_of(&t, "https://y7sauces.com/"), ResourceClass::CriticalShell);
        assert_eq!(class_of(&t, "https://y7sauces.com/manifest.json"), ResourceClass::CriticalShell);
        // Icons are images too, but the shell is checked first.
        assert_eq!(class_of(&t, "https://y7sauces.com/icons/icon-192x192.png"), ResourceClass::CriticalShell);
    }

    #[test]
    fn test_shell_requires_same_origin() {
        let t = table();
        assert_eq!(class_of(&t, "https://cdn.example.com/"), ResourceClass::Default);
    }

    #[test]
    fn test_classify_static_asset() {
        let t = table();
        assert_eq!(class_of(&t, "https://y7sauces.com/assets/index-abc123.js"), ResourceClass::StaticAsset);
        assert_eq!(class_of(&t, "https://y7sauces.com/assets/hero.png"), ResourceClass::StaticAsset);
        assert_eq!(class_of(&t, "https://fonts.example.com/inter.woff2"), ResourceClass::StaticAsset);
        assert_eq!(class_of(&t, "https://y7sauces.com/styles/main.css?v=3"), ResourceClass::StaticAsset);
        assert_eq!(class_of(&t, "https://y7sauces.com/styles/MAIN.CSS"), ResourceClass::StaticAsset);
    }

    #[test]
    fn test_classify_api_call() {
        let t = table();
        assert_eq!(class_of(&t, "https://y7sauces.com/api/v1/products"), ResourceClass::ApiCall);
        assert_eq!(class_of(&t, "https://api.y7sauces.com/v1/cart"), ResourceClass::ApiCall);
    }

    #[test]
    fn test_classify_image() {
        let t = table();
        assert_eq!(class_of(&t, "https://y7sauces.com/images/logo.png"), ResourceClass::Image);
        assert_eq!(class_of(&t, "https://y7sauces.com/products/hot-sauce.JPG"), ResourceClass::Image);
    }

    #[test]
    fn test_classify_default() {
        let t = table();
        assert_eq!(class_of(&t, "https://y7sauces.com/products/mango-habanero"), ResourceClass::Default);
    }

    #[test]
    fn test_route_strategy_and_partition() {
        let t = table();
        let api = t.route(&Request::get(Url::parse("https://y7sauces.com/api/v1/products").unwrap())).unwrap();
        assert_eq!(api.strategy, Strategy::NetworkFirst);
        assert_eq!(api.partition, PartitionRole::Dynamic);

        let other = t.route(&Request::get(Url::parse("https://y7sauces.com/about").unwrap())).unwrap();
        assert_eq!(other.strategy, Strategy::StaleWhileRevalidate);
        assert_eq!(other.partition, PartitionRole::Dynamic);
    }

    #[test]
    fn test_non_get_not_routed() {
        let t = table();
        let req = Request::new("POST", Url::parse("https://y7sauces.com/api/v1/orders").unwrap());
        assert!(t.route(&req).is_none());
    }

    #[test]
    fn test_invalid_pattern() {
        let config = WorkerConfig { static_asset_pattern: "[".into(), ..Default::default() };
        let result = RouteTable::from_config(&config, &Url::parse("https://y7sauces.com").unwrap());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
