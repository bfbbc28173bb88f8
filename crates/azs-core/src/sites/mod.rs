//! Site classification and per-site policy tables
//!
//! Each supported site has one module with its selector tables and a
//! `policy(path, flags)` function. [`policy_for`] dispatches on the
//! classified [`Site`].

use std::fmt;

use serde::Serialize;

use crate::gate::GateConfig;
use crate::route::{extract_host, extract_path};
use crate::settings::{Feature, FeatureFlags};

pub mod instagram;
pub mod x;
pub mod youtube;

// =============================================================================
// Classification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    YouTube,
    Instagram,
    X,
}

impl Site {
    pub const ALL: [Site; 3] = [Site::YouTube, Site::Instagram, Site::X];

    pub const fn name(self) -> &'static str {
        match self {
            Site::YouTube => "youtube",
            Site::Instagram => "instagram",
            Site::X => "x",
        }
    }

    /// The flag that switches this site's protection on or off.
    pub const fn feature(self) -> Feature {
        match self {
            Site::YouTube => Feature::YouTube,
            Site::Instagram => Feature::Instagram,
            Site::X => Feature::X,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Substring match on the host, first match wins.
pub fn classify_host(host: &str) -> Option<Site> {
    if host.contains("youtube.com") {
        Some(Site::YouTube)
    } else if host.contains("instagram.com") {
        Some(Site::Instagram)
    } else if host.contains("x.com") || host.contains("twitter.com") {
        Some(Site::X)
    } else {
        None
    }
}

pub fn classify_url(url: &str) -> Option<Site> {
    extract_host(url).and_then(classify_host)
}

// =============================================================================
// Policy
// =============================================================================

/// Coarse page shape the tables key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Home,
    Watch,
    Shorts,
    Messages,
    Other,
}

/// What the page agent should install for one page state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagePolicy {
    pub site: Option<Site>,
    pub view: View,
    pub gate: Option<GateConfig>,
    pub suppress: Vec<&'static str>,
}

impl PagePolicy {
    /// Nothing to install.
    pub fn idle(site: Option<Site>, view: View) -> Self {
        Self {
            site,
            view,
            gate: None,
            suppress: Vec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.gate.is_none() && self.suppress.is_empty()
    }
}

/// Policy for `url` (full URL or bare path) on `site`.
pub fn policy_for(site: Option<Site>, url: &str, flags: &FeatureFlags) -> PagePolicy {
    let path = extract_path(url);
    match site {
        Some(Site::YouTube) => youtube::policy(path, flags),
        Some(Site::Instagram) => instagram::policy(path, flags),
        Some(Site::X) => x::policy(path, flags),
        None => PagePolicy::idle(None, View::Other),
    }
}

/// Every selector table of every site, for linting.
pub fn all_tables() -> Vec<(&'static str, &'static [&'static str])> {
    let mut tables = Vec::new();
    tables.extend(youtube::TABLES.iter().copied());
    tables.extend(instagram::TABLES.iter().copied());
    tables.extend(x::TABLES.iter().copied());
    tables
}
