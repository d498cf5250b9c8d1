use crate::error::{LciError, LciResult};
use validator::{Validate, ValidationErrors};

pub fn validate_model<T: Validate>(model: &T) -> LciResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(LciError::validation("model", error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    let mut field_errors: Vec<_> = errors.field_errors().into_iter().collect();
    field_errors.sort_by_key(|(field, _)| *field);

    for (field, field_errors) in field_errors {
        for error in field_errors {
            let message = match (&error.message, error.code.as_ref()) {
                (Some(message), _) => format!("{}: {}", field, message),
                (None, "length") => format!("Length validation failed for field '{}'", field),
                (None, "range") => format!("Value out of range for field '{}'", field),
                (None, "required") => format!("Field '{}' is required", field),
                (None, code) => format!("Validation failed for field '{}': {}", field, code),
            };
            messages.push(message);
        }
    }

    messages.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lci_models::BomRecord;

    #[test]
    fn test_validate_model_accepts_valid_record() {
        let record = BomRecord::new(1, "P2", "Bolt", Some(2.0), "P1", "BOM_1");
        assert!(validate_model(&record).is_ok());
    }

    #[test]
    fn test_validate_model_reports_fields() {
        let record = BomRecord::new(1, "P2", "Bolt", Some(-2.0), "P1", "");
        let error = validate_model(&record).unwrap_err();
        assert_eq!(error.error_code(), "VALIDATION_ERROR");

        let message = error.to_string();
        assert!(message.contains("quantity_per_parent"));
        assert!(message.contains("source_id"));
    }
}
