//! Blocking HTTP client shared by the remote collaborators.
//!
//! ## GitHub Authentication
//!
//! Set `GITHUB_TOKEN` to raise the API rate limit from 60/hr to 5000/hr:
//! ```bash
//! export GITHUB_TOKEN="ghp_xxxxxxxxxxxxxxxxxxxx"
//! ```

use crate::core::error::HttpError;
use crate::helpers::internal::progress::upgrade_to_bytes;
use indicatif::ProgressBar;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

const USER_AGENT: &str = concat!("nym-provision/", env!("CARGO_PKG_VERSION"));

/// Thin wrapper over a ureq agent with connect/read timeouts.
///
/// Timeouts apply per connect and per read, so large downloads are not cut
/// off while they keep making progress.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    github_token: Option<String>,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            github_token: std::env::var("GITHUB_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
        }
    }

    /// Fetch a URL as text.
    pub fn get_string(&self, url: &str) -> Result<String, HttpError> {
        self.agent
            .get(url)
            .call()
            .map_err(|e| HttpError::from_ureq(url, e))?
            .into_string()
            .map_err(|source| HttpError::Body {
                url: url.to_string(),
                source,
            })
    }

    /// GET a GitHub API endpoint and parse the JSON body.
    pub fn github_json(&self, url: &str) -> Result<serde_json::Value, HttpError> {
        let mut request = self
            .agent
            .get(url)
            .set("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.github_token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        request
            .call()
            .map_err(|e| HttpError::from_ureq(url, e))?
            .into_json()
            .map_err(|source| HttpError::Body {
                url: url.to_string(),
                source,
            })
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// A partially written file is removed on failure.
    pub fn download_to(
        &self,
        url: &str,
        dest: &Path,
        progress: &ProgressBar,
    ) -> Result<u64, HttpError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| HttpError::from_ureq(url, e))?;

        if let Some(len) = response
            .header("content-length")
            .and_then(|s| s.parse().ok())
        {
            upgrade_to_bytes(progress, len);
        }

        let result = copy_body(url, response.into_reader(), dest, progress);
        if result.is_err() {
            let _ = std::fs::remove_file(dest);
        }
        result
    }
}

fn copy_body(
    url: &str,
    mut reader: impl Read,
    dest: &Path,
    progress: &ProgressBar,
) -> Result<u64, HttpError> {
    let write_err = |source| HttpError::Write {
        path: dest.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::create(dest).map_err(write_err)?;
    let mut buffer = [0u8; 8192];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|source| HttpError::Body {
            url: url.to_string(),
            source,
        })?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read]).map_err(write_err)?;
        total_bytes += bytes_read as u64;
        progress.set_position(total_bytes);
    }

    file.flush().map_err(write_err)?;
    Ok(total_bytes)
}
