//! Declarative validation rules
//!
//! Rules attach to members, entity-action parameters, or whole types. A rule
//! checks a single value and answers with an error message or nothing. The
//! message templates follow the usual data-annotation wording so clients can
//! show them unchanged.

use ria_core::{Entity, Value};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// What a rule can see besides the value it checks
///
/// Implemented by the server's validation context. `&str` implements it as a
/// bare display name with no instance and no services.
pub trait RuleContext {
    /// Name used in error messages
    fn display_name(&self) -> &str;

    /// Member under validation, `None` for type-level checks
    fn member_name(&self) -> Option<&str> {
        None
    }

    /// Entity under validation
    fn instance(&self) -> Option<&Entity> {
        None
    }

    /// Shared item stored under `key`
    fn item(&self, _key: &str) -> Option<&Value> {
        None
    }

    /// Service registered under `type_id`
    fn service_any(&self, _type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }
}

impl dyn RuleContext + '_ {
    /// Typed service lookup
    pub fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.service_any(TypeId::of::<T>())
            .and_then(|s| s.downcast::<T>().ok())
    }
}

impl RuleContext for &str {
    fn display_name(&self) -> &str {
        self
    }
}

/// Check function of a [`ValidationRule::Custom`] rule
///
/// Receives the value under validation (for type-level rules, the instance's
/// data members as a `Value::Object`) and the validation context, and returns
/// an error message on failure.
pub type CustomCheck = Arc<dyn Fn(&Value, &dyn RuleContext) -> Result<(), String> + Send + Sync>;

/// A validation rule
#[derive(Clone)]
pub enum ValidationRule {
    /// Value must be present, non-null, and not an empty string
    Required,
    /// String length must lie in `min..=max` (null passes)
    StringLength {
        /// Minimum length
        min: usize,
        /// Maximum length
        max: usize,
    },
    /// Numeric value must lie in `min..=max` (null passes)
    Range {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Arbitrary check
    Custom {
        /// Rule name, for diagnostics
        name: String,
        /// Check function
        check: CustomCheck,
    },
}

impl ValidationRule {
    /// Build a custom rule
    pub fn custom(
        name: impl Into<String>,
        check: impl Fn(&Value, &dyn RuleContext) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        ValidationRule::Custom {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Check `value`, naming it by the context's display name
    ///
    /// `None` means the value passed; an absent member is passed as `Null`.
    pub fn check(&self, value: &Value, context: &dyn RuleContext) -> Option<String> {
        let display_name = context.display_name();
        match self {
            ValidationRule::Required => {
                let missing = match value {
                    Value::Null => true,
                    Value::String(s) => s.trim().is_empty(),
                    _ => false,
                };
                missing.then(|| format!("The {} field is required.", display_name))
            }
            ValidationRule::StringLength { min, max } => {
                let len = value.as_str()?.chars().count();
                (len < *min || len > *max).then(|| {
                    if *min == 0 {
                        format!(
                            "The field {} must be a string with a maximum length of {}.",
                            display_name, max
                        )
                    } else {
                        format!(
                            "The field {} must be a string with a minimum length of {} and a maximum length of {}.",
                            display_name, min, max
                        )
                    }
                })
            }
            ValidationRule::Range { min, max } => {
                let n = value.as_number()?;
                (n < *min || n > *max).then(|| {
                    format!("The field {} must be between {} and {}.", display_name, min, max)
                })
            }
            ValidationRule::Custom { check, .. } => check(value, context).err(),
        }
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationRule::Required => f.write_str("Required"),
            ValidationRule::StringLength { min, max } => {
                write!(f, "StringLength({}..={})", min, max)
            }
            ValidationRule::Range { min, max } => write!(f, "Range({}..={})", min, max),
            ValidationRule::Custom { name, .. } => write!(f, "Custom({})", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        let rule = ValidationRule::Required;
        assert!(rule.check(&Value::Null, &"Name").is_some());
        assert!(rule.check(&Value::from("  "), &"Name").is_some());
        assert!(rule.check(&Value::from("x"), &"Name").is_none());
        assert!(rule.check(&Value::Int(0), &"Count").is_none());
        assert_eq!(
            rule.check(&Value::Null, &"Name").unwrap(),
            "The Name field is required."
        );
    }

    #[test]
    fn test_string_length() {
        let rule = ValidationRule::StringLength { min: 2, max: 4 };
        assert!(rule.check(&Value::from("a"), &"Code").is_some());
        assert!(rule.check(&Value::from("abc"), &"Code").is_none());
        assert!(rule.check(&Value::from("abcde"), &"Code").is_some());
        assert!(rule.check(&Value::Null, &"Code").is_none());
    }

    #[test]
    fn test_string_length_max_only_message() {
        let rule = ValidationRule::StringLength { min: 0, max: 3 };
        let msg = rule.check(&Value::from("abcd"), &"Code").unwrap();
        assert!(msg.contains("maximum length of 3"));
        assert!(!msg.contains("minimum"));
    }

    #[test]
    fn test_range() {
        let rule = ValidationRule::Range { min: 1.0, max: 10.0 };
        assert!(rule.check(&Value::Int(0), &"Qty").is_some());
        assert!(rule.check(&Value::Int(5), &"Qty").is_none());
        assert!(rule.check(&Value::Float(10.5), &"Qty").is_some());
        assert!(rule.check(&Value::Null, &"Qty").is_none());
    }

    #[test]
    fn test_custom() {
        let rule = ValidationRule::custom("even", |v, _| match v.as_int() {
            Some(i) if i % 2 != 0 => Err("must be even".to_string()),
            _ => Ok(()),
        });
        assert_eq!(rule.check(&Value::Int(3), &"N").as_deref(), Some("must be even"));
        assert!(rule.check(&Value::Int(4), &"N").is_none());
        assert_eq!(format!("{:?}", rule), "Custom(even)");
    }

    #[test]
    fn test_custom_sees_display_name() {
        let rule = ValidationRule::custom("named", |_, ctx| Err(format!("{} rejected", ctx.display_name())));
        assert_eq!(rule.check(&Value::Null, &"Total").as_deref(), Some("Total rejected"));
    }

    #[test]
    fn test_bare_name_context_has_no_services() {
        let ctx: &dyn RuleContext = &"Total";
        assert!(ctx.instance().is_none());
        assert!(ctx.service::<String>().is_none());
    }
}
