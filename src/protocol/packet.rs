//! # Packet Instances
//!
//! A [`PacketInstance`] pairs a schema with the values of its fields. It is
//! immutable once built; the only way to assign fields is through
//! [`PacketBuilder`], which checks each value against its [`FieldSpec`]
//! as it is set.
//!
//! ## Absent and null
//! A field that was never set (or was set to `None` through
//! [`PacketBuilder::set_optional`]) is *Absent* and is omitted from the wire.
//! [`PacketBuilder::set_null`] stores an explicit `Null`, which is written.
//!
//! ## Required fields
//! [`PacketBuilder::build`] does not insist on required fields, so a sender
//! can still produce an envelope that a receiver will reject. Call
//! [`PacketInstance::validate`] for the strict check.
//!
//! [`FieldSpec`]: crate::protocol::schema::FieldSpec

use crate::core::value::{Mapping, Value};
use crate::error::{CodecError, Result};
use crate::protocol::schema::{SchemaDescriptor, PACKET_TYPE_KEY};
use std::sync::Arc;

/// One schema-typed packet
#[derive(Debug, Clone, PartialEq)]
pub struct PacketInstance {
    schema: Arc<SchemaDescriptor>,
    values: Mapping,
    extras: Mapping,
}

impl PacketInstance {
    pub fn builder(schema: Arc<SchemaDescriptor>) -> PacketBuilder {
        PacketBuilder::new(schema)
    }

    /// Assemble a decoded instance. Callers have already checked every value.
    pub(crate) fn from_parts(schema: Arc<SchemaDescriptor>, values: Mapping, extras: Mapping) -> Self {
        Self {
            schema,
            values,
            extras,
        }
    }

    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    pub fn type_id(&self) -> &str {
        &self.schema.type_id
    }

    /// Value of a declared field, `None` when absent
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Present declared fields
    pub fn fields(&self) -> &Mapping {
        &self.values
    }

    /// Keys the schema does not declare, carried through unchanged
    pub fn extras(&self) -> &Mapping {
        &self.extras
    }

    /// Check required fields are present and every value fits its field
    pub fn validate(&self) -> Result<()> {
        if let Some(missing) = self
            .schema
            .required_fields()
            .find(|f| !self.values.contains_key(&f.name))
        {
            return Err(CodecError::MissingRequiredField {
                name: missing.name.clone(),
            });
        }
        for field in &self.schema.fields {
            if let Some(value) = self.values.get(&field.name) {
                field.check(value)?;
            }
        }
        Ok(())
    }
}

/// Field-by-field constructor for [`PacketInstance`]
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    schema: Arc<SchemaDescriptor>,
    values: Mapping,
    extras: Mapping,
}

impl PacketBuilder {
    pub fn new(schema: Arc<SchemaDescriptor>) -> Self {
        let capacity = schema.fields.len();
        Self {
            schema,
            values: Mapping::with_capacity(capacity),
            extras: Mapping::new(),
        }
    }

    /// Assign a declared field, checking the value against its kind and rules
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| CodecError::UnknownField {
                name: name.to_string(),
            })?;
        field.check(&value)?;
        self.values.insert(name.to_string(), value);
        Ok(self)
    }

    /// Assign a field when `Some`, leave it absent when `None`
    pub fn set_optional<V: Into<Value>>(mut self, name: &str, value: Option<V>) -> Result<Self> {
        match value {
            Some(value) => self.set(name, value),
            None => {
                if self.schema.field(name).is_none() {
                    return Err(CodecError::UnknownField {
                        name: name.to_string(),
                    });
                }
                self.values.shift_remove(name);
                Ok(self)
            }
        }
    }

    /// Store an explicit null marker
    pub fn set_null(self, name: &str) -> Result<Self> {
        self.set(name, Value::Null)
    }

    /// Attach a key the schema does not declare
    pub fn set_extra(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        if name == PACKET_TYPE_KEY || self.schema.field(name).is_some() {
            return Err(CodecError::InvalidEnvelope(format!(
                "extra key {name} collides with a declared or reserved key"
            )));
        }
        self.extras.insert(name.to_string(), value.into());
        Ok(self)
    }

    pub fn build(self) -> PacketInstance {
        PacketInstance {
            schema: self.schema,
            values: self.values,
            extras: self.extras,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::core::value::Kind;
    use crate::protocol::catalog;

    fn profile_builder() -> PacketBuilder {
        PacketInstance::builder(Arc::new(catalog::user_profile()))
    }

    #[test]
    fn test_set_checks_kind() {
        let err = profile_builder().set("user_id", "not a number").unwrap_err();
        assert!(matches!(
            err,
            CodecError::FieldKindMismatch { expected: Kind::Int, actual: Kind::Text, .. }
        ));
    }

    #[test]
    fn test_set_rejects_undeclared() {
        assert!(matches!(
            profile_builder().set("nickname", "x"),
            Err(CodecError::UnknownField { name }) if name == "nickname"
        ));
        assert!(profile_builder().set(PACKET_TYPE_KEY, "/x/Y").is_err());
    }

    #[test]
    fn test_absent_versus_null() {
        let packet = profile_builder()
            .set_optional("bio", None::<&str>)
            .unwrap()
            .set_null("age")
            .unwrap()
            .build();
        assert!(packet.get("bio").is_none());
        assert_eq!(packet.get("age"), Some(&Value::Null));
    }

    #[test]
    fn test_required_null_rejected() {
        assert!(profile_builder().set_null("username").is_err());
    }

    #[test]
    fn test_build_allows_missing_required_but_validate_does_not() {
        let packet = profile_builder().set("user_id", 7).unwrap().build();
        assert!(matches!(
            packet.validate(),
            Err(CodecError::MissingRequiredField { name }) if name == "username"
        ));
    }

    #[test]
    fn test_extras_cannot_shadow_fields() {
        assert!(profile_builder().set_extra("email", "x").is_err());
        assert!(profile_builder().set_extra(PACKET_TYPE_KEY, "x").is_err());
        let packet = profile_builder().set_extra("x_trace", 9).unwrap().build();
        assert_eq!(packet.extras().get("x_trace"), Some(&Value::Int(9)));
    }
}
