//! External easyconfig/easyblock repository references.
//!
//! Both references are colon-separated strings whose first two fields rebuild
//! the clone URL (the URL itself contains a colon, e.g.
//! `https://github.com/easybuilders/easybuild-easyconfigs:develop`):
//!
//! ```text
//! easyconfig repo: <host>:<path>:<branch>
//! easyblock repo:  <host>:<path>:<branch>:<file>
//! ```
//!
//! Reachability is checked eagerly at parse time; an unreachable repository
//! aborts recipe generation before anything is written.

use std::time::Duration;

use anyhow::Context;

use crate::error::{Result, SindefError};

/// Validated repository reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Clone URL (fields 0 and 1 of the raw reference, rejoined).
    pub url: String,
    /// Branch checked out by the in-container clone.
    pub branch: String,
    /// Easyblock file inside the cloned tree; easyconfig repos have none.
    pub file: Option<String>,
}

/// Capability seam for the reachability check, so tests never hit the
/// network.
pub trait UrlProbe {
    /// HTTP status for a GET of `url`, or a transport error description.
    fn status(&self, url: &str) -> std::result::Result<u16, String>;
}

/// Real probe: one blocking GET with a short timeout.
pub struct HttpProbe {
    client: reqwest::blocking::Client,
}

impl HttpProbe {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("sindef/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

impl UrlProbe for HttpProbe {
    fn status(&self, url: &str) -> std::result::Result<u16, String> {
        self.client
            .get(url)
            .send()
            .map(|response| response.status().as_u16())
            .map_err(|e| e.to_string())
    }
}

/// Parse and validate an easyconfig repository reference
/// (`<host>:<path>:<branch>`).
pub fn parse_easyconfig_repo(raw: &str, probe: &dyn UrlProbe) -> Result<RepoRef> {
    let fields: Vec<&str> = raw.split(':').collect();
    if fields.len() != 3 {
        return Err(SindefError::InvalidFormat {
            what: "--easyconfig-repo",
            value: raw.to_string(),
        });
    }

    let repo = RepoRef {
        url: format!("{}:{}", fields[0], fields[1]),
        branch: fields[2].to_string(),
        file: None,
    };
    check_reachable(&repo.url, probe)?;
    Ok(repo)
}

/// Parse and validate an easyblock repository reference
/// (`<host>:<path>:<branch>:<file>`).
pub fn parse_easyblock_repo(raw: &str, probe: &dyn UrlProbe) -> Result<RepoRef> {
    let fields: Vec<&str> = raw.split(':').collect();
    if fields.len() != 4 {
        return Err(SindefError::InvalidFormat {
            what: "--easyblock-repo",
            value: raw.to_string(),
        });
    }

    let repo = RepoRef {
        url: format!("{}:{}", fields[0], fields[1]),
        branch: fields[2].to_string(),
        file: Some(fields[3].to_string()),
    };
    check_reachable(&repo.url, probe)?;
    Ok(repo)
}

fn check_reachable(url: &str, probe: &dyn UrlProbe) -> Result<()> {
    match probe.status(url) {
        Ok(200) => Ok(()),
        Ok(code) => Err(SindefError::UnreachableRepo {
            url: url.to_string(),
            reason: format!("HTTP {code}"),
        }),
        Err(reason) => Err(SindefError::UnreachableRepo {
            url: url.to_string(),
            reason,
        }),
    }
}
