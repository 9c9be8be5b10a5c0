//! Source validation
//!
//! A generated process is only trusted if its text can be found in the
//! document it was extracted from. Matching is a case-insensitive substring
//! test per field.

use crate::parser::{Field, FieldRef, ParsedProcess};
use crate::types::RejectedProcess;
use processflow_domain::DEFAULT_DESCRIPTION;
use std::fmt;

/// A field whose value does not appear in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedField {
    /// Field path (e.g. `description`, `sub_processes[0].name`)
    pub field: String,
    /// The value that was not found
    pub value: String,
}

impl fmt::Display for UnsupportedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Potentially hallucinated content in {}: {}", self.field, self.value)
    }
}

/// Checks extracted text against a source document
pub struct SourceValidator {
    source: String,
}

impl SourceValidator {
    /// Create a validator for the given document content
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_lowercase(),
        }
    }

    /// Whether `value` appears in the source, ignoring case
    pub fn contains(&self, value: &str) -> bool {
        self.source.contains(&value.to_lowercase())
    }

    /// Check every validated field of a parsed process
    ///
    /// Synthesized fields and the default description are skipped. Ids are
    /// never checked.
    pub fn validate(&self, parsed: &ParsedProcess) -> Result<(), UnsupportedField> {
        let process = &parsed.process;

        self.check(
            "name",
            &process.name,
            parsed.is_synthesized(FieldRef::Process(Field::Name)),
        )?;
        self.check(
            "description",
            &process.description,
            parsed.is_synthesized(FieldRef::Process(Field::Description)),
        )?;
        self.check_optional("category", process.category.as_deref())?;
        self.check_optional("owner", process.owner.as_deref())?;

        for (idx, step) in process.sub_processes.iter().enumerate() {
            self.check(
                &format!("sub_processes[{}].name", idx),
                &step.name,
                parsed.is_synthesized(FieldRef::Step(idx, Field::Name)),
            )?;
            self.check(
                &format!("sub_processes[{}].description", idx),
                &step.description,
                parsed.is_synthesized(FieldRef::Step(idx, Field::Description)),
            )?;
            self.check_optional(&format!("sub_processes[{}].owner", idx), step.owner.as_deref())?;
        }

        Ok(())
    }

    /// Validate and convert a rejection into a record for the outcome
    pub fn review(&self, parsed: &ParsedProcess) -> Result<(), RejectedProcess> {
        self.validate(parsed).map_err(|issue| RejectedProcess {
            process_id: parsed.process.id.clone(),
            process_name: parsed.process.name.clone(),
            field: issue.field,
            value: issue.value,
        })
    }

    fn check(&self, field: &str, value: &str, synthesized: bool) -> Result<(), UnsupportedField> {
        if synthesized || value == DEFAULT_DESCRIPTION || self.contains(value) {
            return Ok(());
        }
        Err(UnsupportedField {
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    fn check_optional(&self, field: &str, value: Option<&str>) -> Result<(), UnsupportedField> {
        match value {
            Some(value) => self.check(field, value, false),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_processes;

    const SOURCE: &str = "Inventory intake. Step 1: Open Inventory. Step 2: Click New. Owner: Warehouse Clerk.";

    fn parsed(json: &str) -> ParsedProcess {
        parse_processes(json).unwrap().remove(0)
    }

    #[test]
    fn test_case_insensitive_match() {
        let validator = SourceValidator::new(SOURCE);
        let record = parsed(
            r#"[{"id": "p", "name": "inventory INTAKE",
                 "sub_processes": [{"id": "s1", "name": "open inventory", "owner": "warehouse clerk"}]}]"#,
        );
        assert!(validator.validate(&record).is_ok());
    }

    #[test]
    fn test_synthesized_fields_are_exempt() {
        let validator = SourceValidator::new(SOURCE);
        let record = parsed(r#"[{"sub_processes": [{}, {}]}]"#);
        assert_eq!(record.process.name, "Process 1");
        assert!(validator.validate(&record).is_ok());
    }

    #[test]
    fn test_explicit_default_description_is_exempt() {
        let validator = SourceValidator::new(SOURCE);
        let record = parsed(r#"[{"name": "Inventory intake", "description": "No description provided"}]"#);
        assert!(validator.validate(&record).is_ok());
    }

    #[test]
    fn test_ids_are_not_checked() {
        let validator = SourceValidator::new(SOURCE);
        let record = parsed(r#"[{"id": "totally_made_up", "sub_processes": [{"id": "also_made_up"}]}]"#);
        assert!(validator.validate(&record).is_ok());
    }

    #[test]
    fn test_invented_step_rejected() {
        let validator = SourceValidator::new(SOURCE);
        let record = parsed(
            r#"[{"id": "p", "name": "Inventory intake",
                 "sub_processes": [{"name": "Open inventory"}, {"name": "Print labels"}]}]"#,
        );
        let issue = validator.validate(&record).unwrap_err();
        assert_eq!(issue.field, "sub_processes[1].name");
        assert_eq!(issue.value, "Print labels");
        assert!(issue.to_string().contains("Potentially hallucinated"));
    }

    #[test]
    fn test_invented_category_rejected() {
        let validator = SourceValidator::new(SOURCE);
        let record = parsed(r#"[{"name": "Inventory intake", "category": "Finance"}]"#);

        let rejected = validator.review(&record).unwrap_err();
        assert_eq!(rejected.process_id, "process_1");
        assert_eq!(rejected.process_name, "Inventory intake");
        assert_eq!(rejected.field, "category");
    }
}
