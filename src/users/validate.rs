use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::{ApiError, ValidationErrors},
    users::dto::{SigninRequest, SignupRequest},
};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref ALPHA_DASH_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Letters, digits, dashes, and underscores only.
pub(crate) fn is_alpha_dash(value: &str) -> bool {
    ALPHA_DASH_RE.is_match(value)
}

/// Signup payload after field validation passed.
#[derive(Debug)]
pub struct SignupInput {
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug)]
pub struct SigninInput {
    pub user_name: String,
    pub password: String,
}

fn required(errors: &mut ValidationErrors, field: &str, value: &Option<String>) -> bool {
    match value {
        Some(v) if !v.trim().is_empty() => true,
        _ => {
            errors.add(field, format!("The {field} field is required."));
            false
        }
    }
}

fn check_password(errors: &mut ValidationErrors, password: &Option<String>) {
    if required(errors, "password", password) {
        let password = password.as_deref().unwrap_or_default();
        if !is_alpha_dash(password.trim()) {
            errors.add(
                "password",
                "The password field may only contain alpha-numeric characters, \
                 as well as dashes and underscores.",
            );
        }
    }
}

pub fn validate_signup(req: SignupRequest) -> Result<SignupInput, ApiError> {
    let mut errors = ValidationErrors::default();

    required(&mut errors, "userName", &req.user_name);
    if required(&mut errors, "email", &req.email) {
        let email = req.email.as_deref().unwrap_or_default();
        if !is_valid_email(email.trim()) {
            errors.add("email", "The email format is invalid.");
        }
    }
    check_password(&mut errors, &req.password);
    if required(&mut errors, "passwordConfirmation", &req.password_confirmation)
        && req.password_confirmation != req.password
    {
        errors.add(
            "passwordConfirmation",
            "The passwordConfirmation and password fields must match.",
        );
    }
    required(&mut errors, "firstName", &req.first_name);
    required(&mut errors, "lastName", &req.last_name);

    errors.into_result()?;
    Ok(SignupInput {
        user_name: req.user_name.unwrap_or_default(),
        email: req.email.unwrap_or_default(),
        password: req.password.unwrap_or_default(),
        first_name: req.first_name.unwrap_or_default(),
        last_name: req.last_name.unwrap_or_default(),
    })
}

pub fn validate_signin(req: SigninRequest) -> Result<SigninInput, ApiError> {
    let mut errors = ValidationErrors::default();
    required(&mut errors, "userName", &req.user_name);
    check_password(&mut errors, &req.password);
    errors.into_result()?;
    Ok(SigninInput {
        user_name: req.user_name.unwrap_or_default(),
        password: req.password.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_signup() -> SignupRequest {
        SignupRequest {
            user_name: Some("chef".into()),
            email: Some("chef@example.com".into()),
            password: Some("pass_word-1".into()),
            password_confirmation: Some("pass_word-1".into()),
            first_name: Some("Julia".into()),
            last_name: Some("Childs".into()),
        }
    }

    #[test]
    fn accepts_a_complete_payload() {
        let input = validate_signup(full_signup()).expect("valid payload");
        assert_eq!(input.user_name, "chef");
        assert_eq!(input.email, "chef@example.com");
    }

    #[test]
    fn missing_fields_are_reported_per_field() {
        let req = SignupRequest {
            user_name: None,
            email: None,
            password: None,
            password_confirmation: None,
            first_name: Some("Julia".into()),
            last_name: None,
        };
        let err = validate_signup(req).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.0.contains_key("userName"));
        assert!(errors.0.contains_key("email"));
        assert!(errors.0.contains_key("password"));
        assert!(errors.0.contains_key("lastName"));
        assert!(!errors.0.contains_key("firstName"));
    }

    #[test]
    fn empty_payload_reports_password_confirmation_as_required() {
        let req = SignupRequest {
            user_name: None,
            email: None,
            password: None,
            password_confirmation: None,
            first_name: None,
            last_name: None,
        };
        let err = validate_signup(req).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.0["passwordConfirmation"],
            vec!["The passwordConfirmation field is required."]
        );
    }

    #[test]
    fn absent_confirmation_is_required_not_a_mismatch() {
        let mut req = full_signup();
        req.password_confirmation = None;
        let err = validate_signup(req).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.0["passwordConfirmation"],
            vec!["The passwordConfirmation field is required."]
        );
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let mut req = full_signup();
        req.user_name = Some("   ".into());
        let err = validate_signup(req).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.0.contains_key("userName"));
    }

    #[test]
    fn rejects_bad_email_syntax() {
        let mut req = full_signup();
        req.email = Some("not-an-email".into());
        assert!(validate_signup(req).is_err());
    }

    #[test]
    fn rejects_password_with_forbidden_characters() {
        let mut req = full_signup();
        req.password = Some("has spaces!".into());
        req.password_confirmation = Some("has spaces!".into());
        assert!(validate_signup(req).is_err());
    }

    #[test]
    fn password_allows_dashes_and_underscores() {
        assert!(is_alpha_dash("abc-DEF_123"));
        assert!(!is_alpha_dash("abc.def"));
        assert!(!is_alpha_dash(""));
    }

    #[test]
    fn rejects_mismatched_confirmation() {
        let mut req = full_signup();
        req.password_confirmation = Some("different-1".into());
        let err = validate_signup(req).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.0.contains_key("passwordConfirmation"));
    }

    #[test]
    fn signin_requires_both_fields() {
        let err = validate_signin(SigninRequest {
            user_name: None,
            password: None,
        })
        .unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.0.len(), 2);
    }

    #[test]
    fn signin_accepts_valid_credentials_shape() {
        let input = validate_signin(SigninRequest {
            user_name: Some("chef".into()),
            password: Some("pass_word-1".into()),
        })
        .expect("valid payload");
        assert_eq!(input.user_name, "chef");
    }

    #[test]
    fn email_regex_matches_reasonable_addresses() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@sub.domain.org"));
        assert!(!is_valid_email("missing-at.example.com"));
        assert!(!is_valid_email("two@@example.com"));
    }
}
