//! Caller-supplied credentials and the one-time [`AuthMode`] classification.

// self
use crate::{_prelude::*, auth::Secret};

/// Keys and endpoint supplied when constructing a client.
///
/// Blank strings count as absent so `Some("")` never selects a keyed mode.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
	/// Private key used directly as the bearer credential.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub private_key: Option<String>,
	/// Public key exchanged (with a fingerprint) for short-lived tokens.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub public_key: Option<String>,
	/// Service base URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub base_url: Option<String>,
}
impl Credentials {
	/// Credentials for a client sitting behind a trusted proxy.
	pub fn proxy() -> Self {
		Self::default()
	}

	/// Credentials for the public-key token exchange.
	pub fn public_key(key: impl Into<String>) -> Self {
		Self { public_key: Some(key.into()), ..Self::default() }
	}

	/// Credentials holding a private key.
	pub fn private_key(key: impl Into<String>) -> Self {
		Self { private_key: Some(key.into()), ..Self::default() }
	}

	/// Sets the service base URL.
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = Some(base_url.into());

		self
	}

	/// Derives the [`AuthMode`].
	///
	/// A public key wins; otherwise a private key selects [`AuthMode::Direct`]; anything else
	/// (no keys, blank keys) falls back to [`AuthMode::Proxy`].
	pub fn classify(&self) -> AuthMode {
		if let Some(key) = present(&self.public_key) {
			return AuthMode::PublicKey(key.to_owned());
		}
		if let Some(key) = present(&self.private_key) {
			return AuthMode::Direct(Secret::new(key));
		}

		AuthMode::Proxy
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
			.field("public_key", &self.public_key)
			.field("base_url", &self.base_url)
			.finish()
	}
}

fn present(value: &Option<String>) -> Option<&str> {
	value.as_deref().map(str::trim).filter(|key| !key.is_empty())
}

/// Authentication mode selected once per client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthMode {
	/// No client-held secret; a trusted intermediary injects credentials.
	Proxy,
	/// Non-secret public key exchanged for bearer tokens.
	PublicKey(String),
	/// Private key sent directly as the bearer credential.
	Direct(Secret),
}
impl AuthMode {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(&self) -> &'static str {
		match self {
			AuthMode::Proxy => "proxy",
			AuthMode::PublicKey(_) => "public_key",
			AuthMode::Direct(_) => "direct",
		}
	}

	/// Returns `true` for [`AuthMode::PublicKey`].
	pub const fn is_public_key(&self) -> bool {
		matches!(self, AuthMode::PublicKey(_))
	}
}
impl Display for AuthMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
