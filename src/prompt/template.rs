//! `{placeholder}` prompt templates.

use crate::error::{PromptError, Result};
use crate::io::read_file;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Template used to ask the model a question over retrieved context.
pub const DEFAULT_RAG_TEMPLATE: &str = "Tu es un assistant IA expert en intelligence artificielle et en traitement du langage naturel.
Utilise le contexte suivant pour répondre à la question posée.

Contexte:
{context}

Question:
{question}

Réponse détaillée:
";

/// Environment variable naming a template file.
pub const TEMPLATE_ENV_VAR: &str = "RAGPIPE_PROMPT_TEMPLATE";

/// Template location under the user's home directory.
const DEFAULT_TEMPLATE_PATH: &str = ".config/ragpipe/prompt.md";

/// Placeholder holding the retrieved documents.
pub const CONTEXT_VARIABLE: &str = "context";

/// Placeholder holding the user question.
pub const QUESTION_VARIABLE: &str = "question";

// Escaped braces first so `{{x}}` never reads as a placeholder.
const TOKEN_PATTERN: &str = r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}|\{|\}";

fn token_regex() -> std::result::Result<&'static Regex, PromptError> {
    static TOKENS: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    TOKENS
        .get_or_init(|| Regex::new(TOKEN_PATTERN))
        .as_ref()
        .map_err(|e| PromptError::Regex(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Variable(String),
}

/// A parsed prompt template.
///
/// # Examples
///
/// ```
/// use ragpipe::prompt::PromptTemplate;
/// use std::collections::HashMap;
///
/// let template = PromptTemplate::from_template("Bonjour {name} {{ok}}").unwrap();
/// assert_eq!(template.input_variables(), ["name"]);
///
/// let vars = HashMap::from([("name", "Ada")]);
/// assert_eq!(template.format(&vars).unwrap(), "Bonjour Ada {ok}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Parses a template.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::Malformed` for a brace that is neither escaped
    /// nor part of a `{identifier}` placeholder.
    pub fn from_template(text: &str) -> Result<Self> {
        let regex = token_regex()?;
        let mut segments = Vec::new();
        let mut variables: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for captures in regex.captures_iter(text) {
            let Some(token) = captures.get(0) else {
                continue;
            };
            literal.push_str(&text[last..token.start()]);
            last = token.end();

            match (token.as_str(), captures.get(1)) {
                ("{{", _) => literal.push('{'),
                ("}}", _) => literal.push('}'),
                (_, Some(name)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut literal)));
                    }
                    let name = name.as_str().to_string();
                    if !variables.contains(&name) {
                        variables.push(name.clone());
                    }
                    segments.push(Segment::Variable(name));
                }
                _ => {
                    return Err(PromptError::Malformed {
                        offset: token.start(),
                    }
                    .into());
                }
            }
        }

        literal.push_str(&text[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Text(literal));
        }

        Ok(Self {
            source: text.to_string(),
            segments,
            variables,
        })
    }

    /// The default RAG template.
    ///
    /// # Errors
    ///
    /// Returns an error only if the placeholder pattern fails to compile.
    pub fn rag() -> Result<Self> {
        Self::from_template(DEFAULT_RAG_TEMPLATE)
    }

    /// Loads the RAG template.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument (from `--template`)
    /// 2. `RAGPIPE_PROMPT_TEMPLATE` environment variable
    /// 3. `~/.config/ragpipe/prompt.md`, when it exists
    /// 4. [`DEFAULT_RAG_TEMPLATE`]
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read, or if the
    /// template lacks `{context}` or `{question}`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(TEMPLATE_ENV_VAR).map(PathBuf::from);
        let home = dirs::home_dir().map(|h| h.join(DEFAULT_TEMPLATE_PATH));
        Self::load_resolved(path.map(Path::to_path_buf).or(from_env), home)
    }

    fn load_resolved(named: Option<PathBuf>, home: Option<PathBuf>) -> Result<Self> {
        let template = match (named, home) {
            (Some(path), _) => {
                tracing::debug!(path = %path.display(), "loading prompt template");
                Self::from_template(&read_file(&path)?)?
            }
            (None, Some(path)) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading user prompt template");
                Self::from_template(&read_file(&path)?)?
            }
            _ => Self::rag()?,
        };
        template.require_rag_variables()?;
        Ok(template)
    }

    /// Checks that both `{context}` and `{question}` appear.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::MissingPlaceholder` for the first one missing.
    pub fn require_rag_variables(&self) -> Result<()> {
        for name in [CONTEXT_VARIABLE, QUESTION_VARIABLE] {
            if !self.variables.iter().any(|v| v == name) {
                return Err(PromptError::MissingPlaceholder {
                    name: name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Placeholder names in order of first appearance.
    #[must_use]
    pub fn input_variables(&self) -> &[String] {
        &self.variables
    }

    /// The unparsed template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitutes every placeholder.
    ///
    /// Extra entries in `values` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::MissingVariable` if a placeholder has no value.
    pub fn format(&self, values: &HashMap<&str, &str>) -> Result<String> {
        let mut output = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => output.push_str(text),
                Segment::Variable(name) => {
                    let value = values.get(name.as_str()).ok_or_else(|| {
                        PromptError::MissingVariable { name: name.clone() }
                    })?;
                    output.push_str(value);
                }
            }
        }
        Ok(output)
    }

    /// Formats with `context` and `question`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template uses other placeholders.
    pub fn format_rag(&self, context: &str, question: &str) -> Result<String> {
        let values = HashMap::from([(CONTEXT_VARIABLE, context), (QUESTION_VARIABLE, question)]);
        self.format(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn test_rag_template_variables() {
        let template = PromptTemplate::rag().unwrap();
        assert_eq!(template.input_variables(), ["context", "question"]);
        assert!(template.require_rag_variables().is_ok());
    }

    #[test]
    fn test_format_rag() {
        let template = PromptTemplate::rag().unwrap();
        let prompt = template
            .format_rag("Le RAG combine deux étapes.", "Qu'est-ce que le RAG?")
            .unwrap();

        assert!(prompt.starts_with("Tu es un assistant IA"));
        assert!(prompt.contains("Contexte:\nLe RAG combine deux étapes.\n"));
        assert!(prompt.contains("Question:\nQu'est-ce que le RAG?\n"));
        assert!(prompt.trim_end().ends_with("Réponse détaillée:"));
    }

    #[test]
    fn test_variables_first_appearance_order() {
        let template = PromptTemplate::from_template("{b} {a} {b} {c}").unwrap();
        assert_eq!(template.input_variables(), ["b", "a", "c"]);
    }

    #[test]
    fn test_escaped_braces() {
        let template = PromptTemplate::from_template("{{literal}} {x} }}").unwrap();
        assert_eq!(template.input_variables(), ["x"]);
        let out = template.format(&HashMap::from([("x", "1")])).unwrap();
        assert_eq!(out, "{literal} 1 }");
    }

    #[test]
    fn test_missing_variable() {
        let template = PromptTemplate::from_template("{context} / {question}").unwrap();
        let err = template
            .format(&HashMap::from([("context", "c")]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "prompt error: missing template variable: question"
        );
    }

    #[test]
    fn test_value_with_braces_not_reinterpreted() {
        let template = PromptTemplate::from_template("{context}").unwrap();
        let out = template
            .format(&HashMap::from([("context", "{question}")]))
            .unwrap();
        assert_eq!(out, "{question}");
    }

    #[test_case("open { brace", 5 ; "lone open")]
    #[test_case("close } brace", 6 ; "lone close")]
    #[test_case("{not valid}", 0 ; "space in name")]
    #[test_case("{1abc}", 0 ; "leading digit")]
    fn test_malformed(text: &str, offset: usize) {
        let err = PromptTemplate::from_template(text).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("prompt error: malformed template at byte {offset}")
        );
    }

    #[test]
    fn test_require_rag_variables() {
        let template = PromptTemplate::from_template("Only {question}").unwrap();
        let err = template.require_rag_variables().unwrap_err();
        assert!(err.to_string().contains("template must contain {context}"));
    }

    #[test]
    fn test_load_resolved_default() {
        let template = PromptTemplate::load_resolved(None, None).unwrap();
        assert_eq!(template.source(), DEFAULT_RAG_TEMPLATE);
    }

    #[test]
    fn test_load_resolved_missing_home_file_uses_default() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let home = temp_dir.path().join("prompt.md");
        let template = PromptTemplate::load_resolved(None, Some(home)).unwrap();
        assert_eq!(template.source(), DEFAULT_RAG_TEMPLATE);
    }

    #[test]
    fn test_load_resolved_explicit_wins() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let named = temp_dir.path().join("named.md");
        let home = temp_dir.path().join("home.md");
        std::fs::write(&named, "N: {context} {question}").unwrap();
        std::fs::write(&home, "H: {context} {question}").unwrap();

        let template = PromptTemplate::load_resolved(Some(named), Some(home)).unwrap();
        assert!(template.source().starts_with("N:"));
    }

    #[test]
    fn test_load_resolved_explicit_missing_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let named = temp_dir.path().join("absent.md");
        assert!(PromptTemplate::load_resolved(Some(named), None).is_err());
    }

    #[test]
    fn test_load_rejects_template_without_context() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let named = temp_dir.path().join("bad.md");
        std::fs::write(&named, "Question: {question}").unwrap();
        let err = PromptTemplate::load_resolved(Some(named), None).unwrap_err();
        assert!(err.to_string().contains("{context}"));
    }

    proptest! {
        #[test]
        fn plain_text_formats_to_itself(text in "[^{}]*") {
            let template = PromptTemplate::from_template(&text).unwrap();
            prop_assert!(template.input_variables().is_empty());
            prop_assert_eq!(template.format(&HashMap::new()).unwrap(), text);
        }
    }
}
