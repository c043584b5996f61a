//! Field-level validation for incoming drafts.
//!
//! Errors are keyed by the wire name of the field (`nome`, `cpfCnpj`, ...)
//! so the HTTP layer can return them unchanged.

use std::collections::BTreeMap;

use cadastro_core::{Email, PostalCode};
use serde::Serialize;
use thiserror::Error;

/// Field-level validation failures, keyed by wire field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[error("validation failed for {}", .0.keys().copied().collect::<Vec<_>>().join(", "))]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

/// Something that can check itself before it is persisted.
pub trait Validate {
    /// Check every field, collecting all failures.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` listing each offending field.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

impl ValidationErrors {
    /// Create an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    /// Whether no failure was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of the fields that failed.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// Merge another error set into this one.
    pub fn extend(&mut self, other: Self) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one failure was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// A required text field: present, not blank, at most `max` characters.
    pub fn require(&mut self, field: &'static str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.add(field, "campo obrigatório");
        } else {
            self.max_len(field, value, max);
        }
    }

    /// An optional text field: at most `max` characters when present.
    pub fn optional(&mut self, field: &'static str, value: Option<&str>, max: usize) {
        if let Some(value) = value {
            self.max_len(field, value, max);
        }
    }

    /// A required email field.
    pub fn require_email(&mut self, field: &'static str, value: &str, max: usize) {
        if value.trim().is_empty() {
            self.add(field, "campo obrigatório");
            return;
        }
        self.max_len(field, value, max);
        if Email::parse(value).is_err() {
            self.add(field, "e-mail inválido");
        }
    }

    /// A postal code (CEP); `required` controls whether absence is an error.
    pub fn postal_code(&mut self, field: &'static str, value: Option<&str>, required: bool) {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(value) => {
                if PostalCode::parse(value).is_err() {
                    self.add(field, "CEP deve estar no formato XXXXX-XXX");
                }
            }
            None if required => self.add(field, "campo obrigatório"),
            None => {}
        }
    }

    /// A numeric field that must not be negative.
    pub fn non_negative(&mut self, field: &'static str, is_negative: bool) {
        if is_negative {
            self.add(field, "deve ser maior ou igual a zero");
        }
    }

    fn max_len(&mut self, field: &'static str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("máximo de {max} caracteres"));
        }
    }
}

/// Normalize an optional text input: blank becomes `None`.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Serde helper for optional text fields that treats `""` like `null`.
///
/// # Errors
///
/// Propagates the deserializer's error for non-string values.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = <Option<String> as serde::Deserialize>::deserialize(deserializer)?;
    Ok(non_blank(value))
}

/// Serde helper for required text fields that treats `null` like `""`.
///
/// Missing values then surface as a field-level "required" failure instead
/// of a body parse error.
///
/// # Errors
///
/// Propagates the deserializer's error for non-string values.
pub fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = <Option<String> as serde::Deserialize>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reports_blank_and_long_values() {
        let mut errors = ValidationErrors::new();
        errors.require("nome", "   ", 10);
        errors.require("endereco", &"x".repeat(11), 10);
        errors.require("telefone", "1234", 10);

        assert_eq!(errors.messages("nome"), ["campo obrigatório"]);
        assert_eq!(errors.messages("endereco"), ["máximo de 10 caracteres"]);
        assert!(errors.messages("telefone").is_empty());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let mut errors = ValidationErrors::new();
        errors.require("nome", "ãããã", 4);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_require_email() {
        let mut errors = ValidationErrors::new();
        errors.require_email("email", "not-an-email", 200);
        errors.require_email("emailVendas", "vendas@acme.com.br", 200);

        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["email"]);
    }

    #[test]
    fn test_postal_code_required_and_optional() {
        let mut errors = ValidationErrors::new();
        errors.postal_code("cep", None, false);
        assert!(errors.is_empty());

        errors.postal_code("cep", Some(""), true);
        errors.postal_code("cep", Some("1234-567"), true);
        assert_eq!(errors.messages("cep").len(), 2);
    }

    #[test]
    fn test_into_result_and_extend() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut first = ValidationErrors::new();
        first.add("valor", "deve ser maior ou igual a zero");
        let mut second = ValidationErrors::new();
        second.add("valor", "valor inválido");
        first.extend(second);

        let err = first.into_result().unwrap_err();
        assert_eq!(err.messages("valor").len(), 2);
        assert_eq!(err.to_string(), "validation failed for valor");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some("Rua A".to_string())), Some("Rua A".to_string()));
        assert_eq!(non_blank(None), None);
    }
}
