use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

/// Placeholder for data the cluster did not provide.
pub const NOT_AVAILABLE: &str = "N/A";
/// Placeholder ingress class when neither a class name nor a typed default backend is set.
pub const DEFAULT_CLASS: &str = "Default";

/// One ingress as shown to dashboard clients. Every field is always a string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
	pub name: String,
	pub namespace: String,
	pub hostname: String,
	pub ingress_class: String,
	pub status: Status,
	pub creation_timestamp: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
pub enum Status {
	Active,
	Pending,
	NoResources,
	Error,
}

impl Status {
	pub fn as_str(&self) -> &'static str {
		self.into()
	}
}

impl Display for Status {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Field names a filter may refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
	Name,
	Namespace,
	Hostname,
	IngressClass,
	Status,
	CreationTimestamp,
}

impl DisplayRecord {
	pub fn field(&self, field: Field) -> &str {
		match field {
			Field::Name => &self.name,
			Field::Namespace => &self.namespace,
			Field::Hostname => &self.hostname,
			Field::IngressClass => &self.ingress_class,
			Field::Status => self.status.as_str(),
			Field::CreationTimestamp => &self.creation_timestamp,
		}
	}
}

/// Where a set of records came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Source {
	Live,
	Mock,
}

impl Source {
	pub fn as_str(&self) -> &'static str {
		self.into()
	}
}
