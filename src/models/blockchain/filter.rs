use serde::{Deserialize, Serialize};

/// Selects blocks by hash: an explicit list, an inclusive range, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockHashFilter {
	#[serde(default)]
	pub block_hashes: Option<Vec<String>>,
	#[serde(default)]
	pub from_hash: Option<String>,
	#[serde(default)]
	pub to_hash: Option<String>,
}

impl BlockHashFilter {
	/// Both ends of the range, when the range is complete
	pub fn range(&self) -> Option<(&str, &str)> {
		match (&self.from_hash, &self.to_hash) {
			(Some(from), Some(to)) => Some((from.as_str(), to.as_str())),
			_ => None,
		}
	}
}

/// Selects blocks by height: an explicit list, an inclusive range, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockNumFilter {
	#[serde(default)]
	pub block_nums: Option<Vec<u64>>,
	#[serde(default)]
	pub from_num: Option<u64>,
	#[serde(default)]
	pub to_num: Option<u64>,
}

impl BlockNumFilter {
	pub fn range(&self) -> Option<(u64, u64)> {
		match (self.from_num, self.to_num) {
			(Some(from), Some(to)) => Some((from, to)),
			_ => None,
		}
	}
}

/// Filter for `get_blocks`. The hash filter wins when both are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlocksFilter {
	#[serde(default)]
	pub hash_filter: Option<BlockHashFilter>,
	#[serde(default)]
	pub num_filter: Option<BlockNumFilter>,
}

impl BlocksFilter {
	pub fn by_hashes(hashes: Vec<String>) -> Self {
		Self {
			hash_filter: Some(BlockHashFilter {
				block_hashes: Some(hashes),
				..Default::default()
			}),
			num_filter: None,
		}
	}

	pub fn by_hash_range(from: impl Into<String>, to: impl Into<String>) -> Self {
		Self {
			hash_filter: Some(BlockHashFilter {
				block_hashes: None,
				from_hash: Some(from.into()),
				to_hash: Some(to.into()),
			}),
			num_filter: None,
		}
	}

	pub fn by_numbers(numbers: Vec<u64>) -> Self {
		Self {
			hash_filter: None,
			num_filter: Some(BlockNumFilter {
				block_nums: Some(numbers),
				..Default::default()
			}),
		}
	}

	pub fn by_number_range(from: u64, to: u64) -> Self {
		Self {
			hash_filter: None,
			num_filter: Some(BlockNumFilter {
				block_nums: None,
				from_num: Some(from),
				to_num: Some(to),
			}),
		}
	}
}
