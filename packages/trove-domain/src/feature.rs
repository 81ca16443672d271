use std::collections::BTreeSet;

use serde::Serialize;

/// License-gated capabilities that change what search may filter or score on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
	ContentVerification,
	OfficialCollections,
	Sandboxes,
}
impl Feature {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ContentVerification => "content-verification",
			Self::OfficialCollections => "official-collections",
			Self::Sandboxes => "sandboxes",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"content-verification" => Some(Self::ContentVerification),
			"official-collections" => Some(Self::OfficialCollections),
			"sandboxes" => Some(Self::Sandboxes),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
	enabled: BTreeSet<Feature>,
}
impl FeatureSet {
	/// Unknown names are ignored; config validation rejects them before this point.
	pub fn from_names<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		Self { enabled: names.into_iter().filter_map(|name| Feature::parse(name.as_ref())).collect() }
	}

	pub fn with(mut self, feature: Feature) -> Self {
		self.enabled.insert(feature);

		self
	}

	pub fn has(&self, feature: Feature) -> bool {
		self.enabled.contains(&feature)
	}
}
