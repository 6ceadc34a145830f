// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote reachability probing.
//!
//! A sync attempt only defers work into the queue when the network is
//! genuinely down, so the check must be quick and bounded: one HTTP request
//! with a short timeout, where anything other than a timely success answer
//! counts as unreachable. The probe sits behind a trait so the coordinator
//! can be exercised with a canned answer.

use std::time::Duration;

use tracing::debug;

/// Bound on the reachability probe. An offline environment must degrade to
/// queueing, not hang.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Decide whether the central repository is worth contacting.
pub trait ConnectivityProbe {
    /// Check reachability of target url.
    ///
    /// Never errors; any failure to get a timely success answer is `false`.
    fn is_reachable(&self, url: &str) -> bool;
}

/// Probe over plain HTTP.
#[derive(Debug, Default)]
pub struct HttpProbe;

impl HttpProbe {
    /// Construct new HTTP probe.
    pub fn new() -> Self {
        Self
    }
}

impl ConnectivityProbe for HttpProbe {
    /// Check reachability of target url.
    ///
    /// Only http(s) remotes are probed. SSH and local-path remotes have
    /// nothing listening for an HTTP request, so they count as reachable
    /// and the git transport stays the arbiter of real availability.
    fn is_reachable(&self, url: &str) -> bool {
        let Ok(mut target) = reqwest::Url::parse(url) else {
            debug!("skip reachability probe for unparseable remote");
            return true;
        };

        if !matches!(target.scheme(), "http" | "https") {
            debug!("skip reachability probe for non-http remote");
            return true;
        }

        // INVARIANT: Probe the host root, not the repository path. Private
        // repositories answer 404 without credentials even when the network
        // is fine.
        target.set_path("");
        target.set_query(None);

        let client = match reqwest::blocking::Client::builder().timeout(PROBE_TIMEOUT).build() {
            Ok(client) => client,
            Err(_) => return false,
        };

        match client.get(target).send() {
            Ok(response) => {
                let reachable = response.status().is_success();
                debug!("reachability probe answered {}", response.status());
                reachable
            }
            Err(err) => {
                debug!("reachability probe failed: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_http_remotes_skip_the_probe() {
        let probe = HttpProbe::new();
        assert!(probe.is_reachable("git@forge.example.com:awkless/progress.git"));
        assert!(probe.is_reachable("/srv/git/progress.git"));
        assert!(probe.is_reachable("ssh://forge.example.com/progress.git"));
    }

    #[test]
    fn refused_connection_reads_as_unreachable() {
        // INVARIANT: Port 9 (discard) is never served on loopback in test
        // environments, so the connection is refused immediately.
        let probe = HttpProbe::new();
        assert!(!probe.is_reachable("http://127.0.0.1:9/progress.git"));
    }
}
