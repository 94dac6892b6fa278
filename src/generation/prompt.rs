//! Prompt assembly.

use crate::document::Document;

const DEFAULT_TEMPLATE: &str = r#"Given the following document(s), which should each have a reference number,

<documents>{documents}</documents>

Use them to respond to the text in the user_input tags below.

<user_input>{query}</user_input>

The answer could take different levels of brevity or detail, depending on the text below and what its asking, the level of understanding conveyed, etc. It could be as simple as a further elaboration on a basic understanding of a topic (using the info in the document(s)), or it could be giving a detailed answer at a graduate level of explanation.

Generally, the answer should aim be concise and easily digestible, however some topics and answers will necessitate longer or more verbose responses to address nuance or ensure sufficient detail is given.

A very important part of a good answer is that it is cited. For any text that is taken (in one way or another) from the source document above, please cite it by referencing the provided document number. When you cite a reference, please do so by putting it in xml tags with the tag "cited", i.e. "Lorem ipsum <cited>1</cited> lorem lorem lorem ipsum <cited>2</cited>.".

Some ground rules:

ALLOWED MARKDOWN SYNTAX:

Code blocks:
```<language>
<code-to-be-rendered>
```
or `<code>`

NOT ALLOWED MARKDOWN SYNTAX:
- Bolding text via asterisks: **Lorem ipsum**
- Any other Markdown syntax except what was listed under "ALLOWED MARKDOWN SYNTAX"

Answer in plain text. Your plain text may contain code blocks formatted using Markdown syntax, if the user input is coding related (ie it wouldn't be appropriate to include them as part of a general information query).

If you include any code blocks, they should NOT be cited immediately. Any other plain text statements supporting a code block should be cited, per usual.

Each newline will be rendered individually, we are not rendering the entire answer as Markdown, so any double newlines could look strange."#;

/// The template an answer prompt is rendered from.
///
/// An explicit configuration value handed to the generator at construction;
/// `{documents}` and `{query}` are the substitution points.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render the prompt with the numbered document passages and the query.
    pub fn render(&self, query: &str, documents: &[Document]) -> String {
        let combined = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| format!("Document [{}] <doc>{}</doc>", i, doc.passages_text()))
            .collect::<Vec<_>>()
            .join("\n\n");

        self.template
            .replace("{documents}", &combined)
            .replace("{query}", query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Corpus, Passage};

    fn doc(text: &str) -> Document {
        Document {
            passages: vec![Passage {
                text: text.to_string(),
            }],
            title: "t".to_string(),
            corpus: Corpus::Web,
            web_reference: None,
        }
    }

    #[test]
    fn test_render_numbers_documents_from_zero() {
        let template = PromptTemplate::new("{documents}|{query}");
        let rendered = template.render("what?", &[doc("first"), doc("second")]);

        assert_eq!(
            rendered,
            "Document [0] <doc>first</doc>\n\nDocument [1] <doc>second</doc>|what?"
        );
    }

    #[test]
    fn test_default_template_has_substitution_points() {
        let rendered = PromptTemplate::default().render("the query", &[doc("passage")]);
        assert!(rendered.contains("<user_input>the query</user_input>"));
        assert!(rendered.contains("Document [0] <doc>passage</doc>"));
        assert!(!rendered.contains("{documents}"));
        assert!(!rendered.contains("{query}"));
    }
}
