//! Browser/device context provider contract.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Plain key/value record describing the end-user's browser or device.
pub type DeviceContext = BTreeMap<String, Value>;

/// Supplies the optional context sent along with token requests.
pub trait DeviceContextProvider
where
	Self: Send + Sync,
{
	/// Collects the current context.
	fn context(&self) -> DeviceContext;
}

/// Provider returning a fixed record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticDeviceContext(pub DeviceContext);
impl StaticDeviceContext {
	/// Adds or replaces one entry.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.0.insert(key.into(), value.into());

		self
	}
}
impl DeviceContextProvider for StaticDeviceContext {
	fn context(&self) -> DeviceContext {
		self.0.clone()
	}
}
