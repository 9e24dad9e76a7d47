//! Validation of implementation-specific configuration tables.
//!
//! Each pluggable backend describes the keys of its own TOML table with a
//! [`Schema`]; the factory validates the table before building the backend.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Unknown field: {0}")]
	UnknownField(String),
}

#[derive(Debug)]
pub enum FieldType {
	String,
	/// An integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
}

/// Extra check run after the type check passed.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field of a [`Schema`].
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a custom check; its error message is reported as an invalid value.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		self.field_type.check(&self.name, value)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Keys accepted in one implementation table.
///
/// Keys outside `required` and `optional` are rejected so that a misspelled
/// setting fails at startup instead of being ignored.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let Some(table) = config.as_table() else {
			return Err(ValidationError::TypeMismatch {
				field: "root".into(),
				expected: "table".into(),
				actual: config.type_str().into(),
			});
		};

		if let Some(key) = table.keys().find(|key| self.field(key).is_none()) {
			return Err(ValidationError::UnknownField(key.clone()));
		}
		if let Some(field) = self.required.iter().find(|f| !table.contains_key(&f.name)) {
			return Err(ValidationError::MissingField(field.name.clone()));
		}
		table
			.iter()
			.filter_map(|(key, value)| self.field(key).map(|field| (field, value)))
			.try_for_each(|(field, value)| field.check(value))
	}

	fn field(&self, name: &str) -> Option<&Field> {
		self.required
			.iter()
			.chain(&self.optional)
			.find(|field| field.name == name)
	}
}

impl FieldType {
	fn check(&self, field: &str, value: &toml::Value) -> Result<(), ValidationError> {
		let expected = match self {
			FieldType::String if value.is_str() => return Ok(()),
			FieldType::Boolean if value.is_bool() => return Ok(()),
			FieldType::String => "string",
			FieldType::Boolean => "boolean",
			FieldType::Integer { min, max } => match value.as_integer() {
				Some(n) => return check_bounds(field, n, *min, *max),
				None => "integer",
			},
		};
		Err(ValidationError::TypeMismatch {
			field: field.into(),
			expected: expected.into(),
			actual: value.type_str().into(),
		})
	}
}

fn check_bounds(
	field: &str,
	n: i64,
	min: Option<i64>,
	max: Option<i64>,
) -> Result<(), ValidationError> {
	let message = match (min, max) {
		(Some(min), _) if n < min => format!("Value {} is less than minimum {}", n, min),
		(_, Some(max)) if n > max => format!("Value {} is greater than maximum {}", n, max),
		_ => return Ok(()),
	};
	Err(ValidationError::InvalidValue {
		field: field.into(),
		message,
	})
}

/// Implemented by every backend's settings schema.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("name", FieldType::String)],
			vec![
				Field::new(
					"capacity",
					FieldType::Integer {
						min: Some(1),
						max: Some(10),
					},
				),
				Field::new("level", FieldType::String).with_validator(|v| {
					match v.as_str() {
						Some("info") | Some("debug") => Ok(()),
						_ => Err("unsupported level".into()),
					}
				}),
			],
		)
	}

	#[test]
	fn test_valid_table() {
		let config: toml::Value = toml::from_str("name = \"a\"\ncapacity = 3").unwrap();
		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_and_unknown_fields() {
		let config: toml::Value = toml::from_str("capacity = 3").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::MissingField(f)) if f == "name"
		));

		let config: toml::Value = toml::from_str("name = \"a\"\ncolour = 1").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::UnknownField(f)) if f == "colour"
		));
	}

	#[test]
	fn test_bounds_and_custom_validator() {
		let config: toml::Value = toml::from_str("name = \"a\"\ncapacity = 11").unwrap();
		assert!(matches!(
			schema().validate(&config),
			Err(ValidationError::InvalidValue { .. })
		));

		let config: toml::Value = toml::from_str("name = \"a\"\nlevel = \"loud\"").unwrap();
		let err = schema().validate(&config).unwrap_err();
		assert!(err.to_string().contains("unsupported level"));
	}
}
