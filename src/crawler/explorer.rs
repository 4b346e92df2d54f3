use crate::config::ScanConfig;
use crate::error::{Error, Result};
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Breadth-first frontier over same-origin URLs.
///
/// One instance per viewport crawl. The visited set only ever grows; a URL
/// is enqueued at most once, and dequeue order is strict FIFO so shallower
/// pages are always visited before deeper ones.
pub struct Explorer {
    base_host: String,
    max_depth: usize,
    enable_navigation: bool,
    visited: HashSet<String>,
    queue: VecDeque<FrontierEntry>,
    asset_re: Regex,
    auth_re: Regex,
}

/// A URL awaiting its visit, tagged with the depth it was discovered at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: usize,
}

impl Explorer {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let base = Url::parse(&config.url).map_err(|source| Error::InvalidUrl {
            url: config.url.clone(),
            source,
        })?;
        let base_host = base.host_str().unwrap_or_default().to_lowercase();

        Ok(Self {
            base_host,
            max_depth: config.max_depth,
            enable_navigation: config.enable_navigation,
            visited: HashSet::new(),
            queue: VecDeque::new(),
            asset_re: Regex::new(
                r"(?i)\.(pdf|zip|png|jpg|jpeg|gif|svg|ico|css|js|woff|woff2|ttf|eot)$",
            )
            .expect("asset pattern is valid"),
            auth_re: Regex::new(r"(?i)/(logout|signout|auth/|oauth/)").expect("auth pattern is valid"),
        })
    }

    /// Seed the frontier with the starting URL at depth 0.
    pub fn init(&mut self, start_url: &str) {
        let normalized = normalize_url(start_url);
        self.visited.insert(normalized.clone());
        self.queue.push_back(FrontierEntry {
            url: normalized,
            depth: 0,
        });
    }

    /// Pop the next URL to visit, breadth-first.
    pub fn next(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Feed anchor hrefs found on the current page into the frontier.
    ///
    /// Hrefs may be relative; they are resolved against `current_url`.
    /// Returns only the URLs that were newly enqueued.
    pub fn discover_links(
        &mut self,
        current_url: &str,
        hrefs: &[String],
        current_depth: usize,
    ) -> Vec<String> {
        if !self.enable_navigation || current_depth >= self.max_depth {
            return Vec::new();
        }

        let Ok(current) = Url::parse(current_url) else {
            return Vec::new();
        };

        let mut new_links = Vec::new();

        for href in hrefs {
            let Ok(resolved) = current.join(href) else {
                continue;
            };

            if !self.should_enqueue(&resolved, &current) {
                continue;
            }

            let normalized = normalize_url(resolved.as_str());
            if self.visited.contains(&normalized) {
                continue;
            }

            self.visited.insert(normalized.clone());
            self.queue.push_back(FrontierEntry {
                url: normalized.clone(),
                depth: current_depth + 1,
            });
            ::log::debug!("Discovered: {} (depth {})", normalized, current_depth + 1);
            new_links.push(normalized);
        }

        if !new_links.is_empty() {
            ::log::info!(
                "Discovered {} new links (depth {})",
                new_links.len(),
                current_depth + 1
            );
        }

        new_links
    }

    /// Filtering rules for one candidate link.
    fn should_enqueue(&self, url: &Url, current: &Url) -> bool {
        // Same hostname as the original target only
        if url
            .host_str()
            .is_none_or(|h| !h.eq_ignore_ascii_case(&self.base_host))
        {
            return false;
        }

        // HTTP(S) only
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        // Pure in-page anchors point back at the page we are already on
        if url.path() == current.path() && url.fragment().is_some() {
            return false;
        }

        // Static assets are not pages
        if self.asset_re.is_match(url.path()) {
            return false;
        }

        // Never walk into logout/auth flows
        if self.auth_re.is_match(url.path()) {
            return false;
        }

        true
    }

    pub fn has_more(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Normalize a URL for dedup: strip the fragment, strip a trailing slash
/// (except on the root path) and sort query parameters.
pub fn normalize_url(url_str: &str) -> String {
    let Ok(mut url) = Url::parse(url_str) else {
        return url_str.to_string();
    };

    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        pairs.sort();
        let query = pairs
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    k.clone()
                } else {
                    format!("{}={}", k, v)
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;

    fn explorer(url: &str, max_depth: usize) -> Explorer {
        let mut config = ScanConfig::new(url);
        config.max_depth = max_depth;
        Explorer::new(&config).unwrap()
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let cases = [
            "https://example.com/a/?b=2&a=1#frag",
            "https://example.com/",
            "https://example.com/path/",
            "https://example.com/x?z=9&y=8&a=1",
        ];
        for case in cases {
            let once = normalize_url(case);
            assert_eq!(normalize_url(&once), once, "not idempotent for {}", case);
        }
    }

    #[test]
    fn test_normalize_strips_fragment_and_sorts_query() {
        assert_eq!(
            normalize_url("https://example.com/a?b=2&a=1#top"),
            normalize_url("https://example.com/a/?a=1&b=2")
        );
    }

    #[test]
    fn test_normalize_keeps_root_slash() {
        assert_eq!(normalize_url("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn test_init_marks_start_visited() {
        let mut ex = explorer("https://example.com", 3);
        ex.init("https://example.com");
        assert_eq!(ex.visited_count(), 1);
        let entry = ex.next().unwrap();
        assert_eq!(entry.depth, 0);
        assert!(!ex.has_more());
    }

    #[test]
    fn test_no_url_enqueued_twice() {
        let mut ex = explorer("https://example.com", 3);
        ex.init("https://example.com");

        let links = vec![
            "https://example.com/a".to_string(),
            "https://example.com/a/".to_string(),
            "https://example.com/a#section".to_string(),
        ];
        let first = ex.discover_links("https://example.com", &links, 0);
        assert_eq!(first, vec!["https://example.com/a"]);

        // A second pass over the same links discovers nothing new
        let second = ex.discover_links("https://example.com", &links, 0);
        assert!(second.is_empty());
        assert_eq!(ex.visited_count(), 2);
    }

    #[test]
    fn test_bfs_ordering() {
        let mut ex = explorer("https://example.com", 3);
        ex.init("https://example.com");
        assert_eq!(ex.next().unwrap().depth, 0);

        ex.discover_links(
            "https://example.com",
            &["https://example.com/a".to_string(), "https://example.com/b".to_string()],
            0,
        );
        let a = ex.next().unwrap();
        ex.discover_links("https://example.com/a", &["https://example.com/c".to_string()], a.depth);

        // b (depth 1) was enqueued before c (depth 2) and must come out first
        let b = ex.next().unwrap();
        assert_eq!(b.url, "https://example.com/b");
        assert_eq!(b.depth, 1);
        let c = ex.next().unwrap();
        assert_eq!(c.depth, 2);
    }

    #[test]
    fn test_depth_bound_stops_discovery() {
        let mut ex = explorer("https://example.com", 1);
        ex.init("https://example.com");

        let links = vec![
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string(),
            "https://example.com/c".to_string(),
        ];
        let found = ex.discover_links("https://example.com", &links, 0);
        assert_eq!(found.len(), 3);

        // Pages at depth 1 may not contribute further links
        let deeper = ex.discover_links(
            "https://example.com/a",
            &["https://example.com/d".to_string()],
            1,
        );
        assert!(deeper.is_empty());
    }

    #[test]
    fn test_filters_foreign_assets_auth_and_schemes() {
        let mut ex = explorer("https://example.com", 3);
        ex.init("https://example.com");

        let links = vec![
            "https://other.com/page".to_string(),
            "https://example.com/file.pdf".to_string(),
            "https://example.com/style.css".to_string(),
            "https://example.com/font.woff2".to_string(),
            "https://example.com/logout".to_string(),
            "https://example.com/auth/login".to_string(),
            "mailto:hi@example.com".to_string(),
            "https://example.com/ok".to_string(),
        ];
        let found = ex.discover_links("https://example.com", &links, 0);
        assert_eq!(found, vec!["https://example.com/ok"]);
    }

    #[test]
    fn test_relative_links_resolve_against_current_page() {
        let mut ex = explorer("https://example.com", 3);
        ex.init("https://example.com");

        let found = ex.discover_links(
            "https://example.com/docs/intro",
            &["../pricing".to_string(), "details".to_string()],
            0,
        );
        assert_eq!(
            found,
            vec![
                "https://example.com/pricing",
                "https://example.com/docs/details"
            ]
        );
    }

    #[test]
    fn test_in_page_anchor_skipped() {
        let mut ex = explorer("https://example.com", 3);
        ex.init("https://example.com/docs");

        let found = ex.discover_links(
            "https://example.com/docs",
            &["https://example.com/docs#install".to_string()],
            0,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn test_navigation_disabled_discovers_nothing() {
        let mut config = ScanConfig::new("https://example.com");
        config.enable_navigation = false;
        let mut ex = Explorer::new(&config).unwrap();
        ex.init("https://example.com");

        let found = ex.discover_links(
            "https://example.com",
            &["https://example.com/a".to_string()],
            0,
        );
        assert!(found.is_empty());
    }
}
