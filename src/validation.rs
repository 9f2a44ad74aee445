use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub type CustomRule = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Declarative rule set for a single form field. Rules are checked in a fixed
/// order and the first failure wins: required, min_length, max_length,
/// pattern, custom.
#[derive(Default)]
pub struct FieldRules {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub custom: Option<CustomRule>,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn custom<F>(mut self, rule: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.custom = Some(Box::new(rule));
        self
    }
}

pub fn email_pattern() -> Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
        .clone()
}

fn display_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Returns the first failing rule's message, or an empty string when the value
/// passes. Note: min_length applies even to empty values on non-required
/// fields; callers that want optional length checks must omit the rule.
pub fn validate_field(name: &str, value: &str, rules: &FieldRules) -> String {
    if rules.required && value.trim().is_empty() {
        return format!("{} is required", display_name(name));
    }

    if let Some(min) = rules.min_length {
        if value.chars().count() < min {
            return format!("{} must be at least {} characters", display_name(name), min);
        }
    }

    if let Some(max) = rules.max_length {
        if value.chars().count() > max {
            return format!("{} must be no more than {} characters", display_name(name), max);
        }
    }

    if let Some(pattern) = &rules.pattern {
        if !pattern.is_match(value) {
            if name == "email" {
                return "Please enter a valid email address".to_string();
            }
            return format!("{} format is invalid", display_name(name));
        }
    }

    if let Some(custom) = &rules.custom {
        if let Some(error) = custom(value) {
            return error;
        }
    }

    String::new()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormField {
    pub value: String,
    pub error: String,
    pub touched: bool,
}

/// Per-field `{value, error, touched}` aggregate backing a form.
#[derive(Default)]
pub struct FormState {
    fields: BTreeMap<String, FormField>,
}

impl FormState {
    pub fn new(seed: &[(&str, &str)]) -> Self {
        let mut fields = BTreeMap::new();
        for (name, value) in seed {
            fields.insert(
                (*name).to_string(),
                FormField {
                    value: (*value).to_string(),
                    error: String::new(),
                    touched: false,
                },
            );
        }
        Self { fields }
    }

    /// Sets the value, marks the field touched and recomputes its error when
    /// rules are supplied; clears the error otherwise.
    pub fn update_field(&mut self, name: &str, value: &str, rules: Option<&FieldRules>) {
        let error = match rules {
            Some(rules) => validate_field(name, value, rules),
            None => String::new(),
        };
        self.fields.insert(
            name.to_string(),
            FormField {
                value: value.to_string(),
                error,
                touched: true,
            },
        );
    }

    /// Revalidates every field named in the rules map, forcing touched.
    /// Fields without an entry in the map are left alone. Returns true iff no
    /// named field fails.
    pub fn validate_form(&mut self, rules: &[(&str, FieldRules)]) -> bool {
        let mut valid = true;
        for (name, field_rules) in rules {
            let value = self
                .fields
                .get(*name)
                .map(|field| field.value.clone())
                .unwrap_or_default();
            let error = validate_field(name, &value, field_rules);
            if !error.is_empty() {
                valid = false;
            }
            self.fields.insert(
                (*name).to_string(),
                FormField {
                    value,
                    error,
                    touched: true,
                },
            );
        }
        valid
    }

    /// Clears every field back to an empty, untouched state. Seed values are
    /// not restored.
    pub fn reset_form(&mut self) {
        for field in self.fields.values_mut() {
            *field = FormField::default();
        }
    }

    pub fn field_value(&self, name: &str) -> &str {
        self.fields.get(name).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn field_error(&self, name: &str) -> &str {
        self.fields.get(name).map(|f| f.error.as_str()).unwrap_or("")
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.fields.get(name).map(|f| f.touched).unwrap_or(false)
    }

    pub fn has_errors(&self) -> bool {
        self.fields.values().any(|field| !field.error.is_empty())
    }

    /// Non-empty errors keyed by field name, for 422 response bodies.
    pub fn errors(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter(|(_, field)| !field.error.is_empty())
            .map(|(name, field)| (name.clone(), field.error.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_whitespace_only() {
        let rules = FieldRules::new().required();
        assert_eq!(validate_field("name", "", &rules), "Name is required");
        assert_eq!(validate_field("name", "   ", &rules), "Name is required");
        assert_eq!(validate_field("name", "Ada", &rules), "");
    }

    #[test]
    fn min_length_boundary() {
        let rules = FieldRules::new().min_length(6);
        assert_eq!(
            validate_field("password", "abc", &rules),
            "Password must be at least 6 characters"
        );
        assert_eq!(validate_field("password", "abcdef", &rules), "");
    }

    #[test]
    fn min_length_applies_to_empty_optional_fields() {
        // Observed behavior: a non-required empty value still fails min_length.
        let rules = FieldRules::new().min_length(2);
        assert_eq!(
            validate_field("nickname", "", &rules),
            "Nickname must be at least 2 characters"
        );
    }

    #[test]
    fn max_length_boundary() {
        let rules = FieldRules::new().max_length(3);
        assert_eq!(
            validate_field("code", "abcd", &rules),
            "Code must be no more than 3 characters"
        );
        assert_eq!(validate_field("code", "abc", &rules), "");
    }

    #[test]
    fn email_pattern_has_fixed_message() {
        let rules = FieldRules::new().required().pattern(email_pattern());
        assert_eq!(
            validate_field("email", "not-an-email", &rules),
            "Please enter a valid email address"
        );
        assert_eq!(validate_field("email", "ada@example.com", &rules), "");
    }

    #[test]
    fn non_email_pattern_uses_generic_message() {
        let rules = FieldRules::new().pattern(Regex::new(r"^\d+$").unwrap());
        assert_eq!(validate_field("zip", "abc", &rules), "Zip format is invalid");
    }

    #[test]
    fn first_failure_wins() {
        let rules = FieldRules::new()
            .required()
            .min_length(6)
            .custom(|_| Some("custom error".to_string()));
        // required fires before min_length and custom
        assert_eq!(validate_field("password", " ", &rules), "Password is required");
    }

    #[test]
    fn empty_rules_always_pass() {
        assert_eq!(validate_field("anything", "", &FieldRules::new()), "");
    }

    #[test]
    fn confirm_password_custom_rule() {
        let password = "Secret1".to_string();
        let rules = FieldRules::new().required().custom(move |value: &str| {
            if value != password {
                Some("Passwords do not match".to_string())
            } else {
                None
            }
        });
        assert_eq!(
            validate_field("confirm_password", "Secret2", &rules),
            "Passwords do not match"
        );
        assert_eq!(validate_field("confirm_password", "Secret1", &rules), "");
    }

    #[test]
    fn stale_confirm_password_until_revalidated() {
        // The rule captures the password at construction; changing the
        // password later does not retroactively fix the confirm field until
        // the caller revalidates it with a fresh rule.
        let captured = "OldPass1".to_string();
        let rules = FieldRules::new().custom(move |value: &str| {
            if value != captured {
                Some("Passwords do not match".to_string())
            } else {
                None
            }
        });

        let mut form = FormState::new(&[("password", ""), ("confirm_password", "")]);
        form.update_field("confirm_password", "OldPass1", Some(&rules));
        assert_eq!(form.field_error("confirm_password"), "");

        form.update_field("password", "NewPass1", None);
        // Still clean against the stale capture.
        assert_eq!(form.field_error("confirm_password"), "");

        let fresh = FieldRules::new().custom(|value: &str| {
            if value != "NewPass1" {
                Some("Passwords do not match".to_string())
            } else {
                None
            }
        });
        form.update_field("confirm_password", "OldPass1", Some(&fresh));
        assert_eq!(form.field_error("confirm_password"), "Passwords do not match");
    }

    #[test]
    fn validate_form_touches_only_named_fields() {
        let mut form = FormState::new(&[("email", ""), ("notes", "")]);
        let rules = vec![("email", FieldRules::new().required())];
        assert!(!form.validate_form(&rules));
        assert!(form.is_touched("email"));
        assert!(!form.is_touched("notes"));
        assert_eq!(form.field_error("email"), "Email is required");
    }

    #[test]
    fn validate_form_true_when_clean() {
        let mut form = FormState::new(&[("email", "")]);
        form.update_field("email", "ada@example.com", None);
        let rules = vec![(
            "email",
            FieldRules::new().required().pattern(email_pattern()),
        )];
        assert!(form.validate_form(&rules));
        assert!(!form.has_errors());
    }

    #[test]
    fn reset_round_trip_only_restores_empty_seeds() {
        let mut form = FormState::new(&[("title", "seeded"), ("notes", "")]);
        form.update_field("title", "changed", None);
        form.reset_form();

        // Empty-seeded fields are indistinguishable from a fresh form.
        let fresh = FormState::new(&[("notes", "")]);
        assert_eq!(form.field_value("notes"), fresh.field_value("notes"));
        assert!(!form.is_touched("notes"));

        // Non-empty seeds are NOT restored by reset.
        assert_eq!(form.field_value("title"), "");
    }

    #[test]
    fn has_errors_ignores_touched() {
        let mut form = FormState::new(&[("email", "")]);
        let rules = vec![("email", FieldRules::new().required())];
        form.validate_form(&rules);
        assert!(form.has_errors());
        assert_eq!(form.errors().get("email").unwrap(), "Email is required");
    }
}
