use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

use crate::models::ConfigError;

/// One egress proxy, parsed from a `host:port[:user:pass]` line.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Proxy {
	pub host: String,
	pub port: u16,
	pub credentials: Option<ProxyCredentials>,
	/// Request timeout applied to every client routed through this proxy
	pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProxyCredentials {
	pub username: String,
	pub password: String,
}

impl Proxy {
	/// Parses a single proxy line.
	///
	/// # Arguments
	/// * `line` - `host:port` or `host:port:user:pass`
	/// * `timeout` - Timeout for requests sent through the proxy
	///
	/// # Returns
	/// * `Result<Self, ConfigError>` - The proxy, or a parse error naming the bad line
	pub fn parse(line: &str, timeout: Duration) -> Result<Self, ConfigError> {
		let parts: Vec<&str> = line.trim().split(':').collect();

		let invalid = |reason: &str| {
			ConfigError::parse_error(
				format!("Invalid proxy '{}': {}", line.trim(), reason),
				None,
				None,
			)
		};

		let (host, port) = match parts.as_slice() {
			[host, port] | [host, port, _, _] => (*host, *port),
			_ => return Err(invalid("expected host:port or host:port:user:pass")),
		};

		if host.is_empty() {
			return Err(invalid("host is empty"));
		}

		let port = port
			.parse::<u16>()
			.map_err(|_| invalid("port is not a number"))?;

		let credentials = match parts.as_slice() {
			[_, _, username, password] => Some(ProxyCredentials {
				username: username.to_string(),
				password: password.to_string(),
			}),
			_ => None,
		};

		Ok(Self {
			host: host.to_string(),
			port,
			credentials,
			timeout,
		})
	}

	/// Loads every proxy from a file with one proxy per line.
	///
	/// Blank lines and lines starting with `#` are skipped. A missing file yields an
	/// empty list, so the caller decides whether proxies are required.
	pub async fn load_all(path: &Path, timeout: Duration) -> Result<Vec<Self>, ConfigError> {
		let content = match tokio::fs::read_to_string(path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => {
				return Err(ConfigError::file_error(
					format!("Failed to read proxy list {}", path.display()),
					Some(Box::new(e)),
					None,
				))
			}
		};

		content
			.lines()
			.map(str::trim)
			.filter(|line| !line.is_empty() && !line.starts_with('#'))
			.map(|line| Self::parse(line, timeout))
			.collect()
	}

	/// Converts this proxy into a `reqwest::Proxy` covering every scheme.
	pub fn to_reqwest_proxy(&self) -> Result<reqwest::Proxy, reqwest::Error> {
		let proxy = reqwest::Proxy::all(format!("http://{}:{}", self.host, self.port))?;
		Ok(match &self.credentials {
			Some(credentials) => proxy.basic_auth(&credentials.username, &credentials.password),
			None => proxy,
		})
	}
}
