//! Prompts for extraction and elaboration

use processflow_domain::{Process, SubProcess};

/// Sections every elaborated step must contain
pub const REQUIRED_SECTIONS: [&str; 3] = ["1. SCOPE", "2. PROCEDURE", "3. CONTROL CRITERIA"];

/// Fallback when no duration estimate could be generated
pub const DURATION_NOT_SPECIFIED: &str = "Duration not specified";

/// Builds the extraction prompt for a document
pub struct PromptBuilder<'a> {
    text: &'a str,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        prompt.push_str("Document to analyze:\n");
        prompt.push_str("---\n");
        prompt.push_str(self.text);
        prompt.push_str("\n---\n\n");

        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }
}

const EXTRACTION_INSTRUCTIONS: &str = r#"Analyze this document and extract ONLY the processes and information that are EXPLICITLY mentioned in the text.

STRICT RULES:
1. Extract ONLY processes and steps that are EXPLICITLY mentioned
2. Do NOT invent or assume information that is not present
3. If a value is not mentioned, leave the field out
4. Use EXACTLY the same terminology that appears in the text
5. Keep the same level of detail as the original text
6. If something is ambiguous, leave it as it is - do not try to clarify it"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (JSON array only, no additional text):
[
  {
    "id": "process_1",
    "name": "EXACTLY as it appears in the text",
    "description": "ONLY explicitly mentioned information",
    "category": "ONLY if explicitly mentioned",
    "sub_processes": [
      {
        "id": "sub_1",
        "name": "EXACTLY as it appears in the text",
        "description": "ONLY explicitly mentioned information",
        "order": 1
      }
    ]
  }
]"#;

/// Short description of a process used as context for step prompts
pub fn process_context(process: &Process) -> String {
    format!(
        "Main process: {}\nDescription: {}\nCategory: {}",
        process.name,
        process.description,
        process.category.as_deref().unwrap_or("Not specified")
    )
}

/// Prompt that refines a process description
pub fn description_prompt(process: &Process) -> String {
    format!(
        r#"Based on this process information, write a clear and detailed description:
Process name: {}
Current description: {}
Category: {}

Please:
1. Keep the same meaning and scope
2. Use clear, professional language
3. Organize the information logically
4. Include the main objective of the process
5. Mention the expected results
6. Highlight any important requirements"#,
        process.name,
        process.description,
        process.category.as_deref().unwrap_or("Not specified")
    )
}

/// Prompt that turns a step into sectioned instructions
pub fn step_prompt(step: &SubProcess, context: &str) -> String {
    format!(
        r#"Based on this sub-process information:

Main process context:
{context}

Sub-process: {name}
Base description: {description}
Order: {order}

Write a sequential description of the sub-process using this format:

1. SCOPE
[Briefly describe the specific scope mentioned in the input]

2. PROCEDURE
2.1. [Specific action starting with an imperative verb]
     "Describe the exact action to perform"

2.2. [Next action starting with an imperative verb]
     "Describe the next exact action"
...

3. CONTROL CRITERIA
[Only if checkpoints are specifically mentioned]
- What exactly must be verified
- What the expected result is

RULES:
1. Start every action with an imperative verb
2. Keep the exact sequence mentioned
3. Be specific and direct in every step
4. Do NOT add information that was not mentioned
5. Do NOT assume intermediate steps"#,
        context = context,
        name = step.name,
        description = step.description,
        order = step.order
    )
}

/// Prompt that asks for a duration estimate
pub fn duration_prompt(description: &str) -> String {
    format!(
        r#"Based on this step description, estimate a realistic duration:
{}

Consider:
1. Complexity of the task
2. Required system interactions
3. Manual vs automated steps
4. Potential waiting times

Respond with ONLY the estimated duration in a clear format (e.g., "15 minutes", "1 hour", "2-3 days")."#,
        description
    )
}

/// Required sections missing from `text`
pub fn missing_sections(text: &str) -> Vec<&'static str> {
    REQUIRED_SECTIONS
        .iter()
        .copied()
        .filter(|section| !text.contains(section))
        .collect()
}

/// Rough token cost of a call: about four characters per prompt token plus
/// the output budget
pub fn estimate_tokens(prompt: &str, expected_output_tokens: u64) -> u64 {
    let chars = prompt.chars().count() as u64;
    chars.div_ceil(4) + expected_output_tokens
}
