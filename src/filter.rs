use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Deserialize;

use crate::record::{DisplayRecord, Field};

/// Query parameter names that differ from the record field they filter on.
const ALIASES: &[(&str, &str)] = &[("ingress_class_name", "ingress_class")];

/// Field name to expected value. Keys that name no record field are kept but never exclude a record.
///
/// Deserialized maps go through the same normalization as query parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, String>")]
pub struct FilterSpec(BTreeMap<String, String>);

impl FilterSpec {
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.0.insert(key.into(), value.into());
	}

	/// Builds a filter from HTTP query parameters: empty values mean "no constraint", and the
	/// `ingress_class_name` alias maps onto `ingress_class`. The field's own name wins over its alias.
	pub fn from_query<'a>(params: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
		let mut spec = Self::default();
		for (key, value) in params {
			if value.trim().is_empty() {
				continue;
			}
			match ALIASES.iter().find(|(alias, _)| *alias == key.as_str()) {
				Some(&(_, field)) => {
					spec.0
						.entry(field.to_string())
						.or_insert_with(|| value.clone());
				},
				None => spec.insert(key.as_str(), value.as_str()),
			}
		}
		spec
	}

	fn constraints(&self) -> impl Iterator<Item = (Field, String)> + '_ {
		self.0.iter().filter_map(|(key, value)| {
			Field::from_str(key)
				.ok()
				.map(|field| (field, value.to_lowercase()))
		})
	}
}

impl From<BTreeMap<String, String>> for FilterSpec {
	fn from(map: BTreeMap<String, String>) -> Self {
		Self::from_query(&map)
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterSpec {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(
			iter.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		)
	}
}

/// Ordered subsequence of `records` satisfying every known constraint in `filters`.
pub fn apply(records: &[DisplayRecord], filters: &FilterSpec) -> Vec<DisplayRecord> {
	if filters.is_empty() {
		return records.to_vec();
	}
	let constraints: Vec<_> = filters.constraints().collect();
	records
		.iter()
		.filter(|record| {
			constraints
				.iter()
				.all(|(field, expected)| record.field(*field).to_lowercase() == *expected)
		})
		.cloned()
		.collect()
}
