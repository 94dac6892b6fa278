//! Document value types shared between retrieval, generation and the
//! client-facing reference event.

use serde::{Deserialize, Serialize};

/// A single span of text from a retrieved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
}

/// A retrieved document and its provenance.
///
/// Immutable once constructed. `web_reference` is present iff the document
/// came from the web corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Passages that make up the document, ordered by relevance to the query.
    pub passages: Vec<Passage>,
    pub title: String,
    pub corpus: Corpus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_reference: Option<WebReference>,
}

impl Document {
    /// All passage text joined into one string, for prompt assembly.
    pub fn passages_text(&self) -> String {
        self.passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Where a web document came from, so it can be referenced or cited later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebReference {
    pub title: String,
    /// Canonical URL of the page.
    pub link: String,
    pub displayed_link: String,
    pub blurb: String,
    pub date: String,
    pub author: String,
    pub favicon: String,
    pub thumbnail: String,
    /// Which retriever produced this reference (e.g. "serp", "exa").
    pub api_source: String,
}

/// The named category of source a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corpus {
    Web,
    Personal,
}

impl Corpus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Corpus::Web => "web",
            Corpus::Personal => "personal",
        }
    }
}

impl std::fmt::Display for Corpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Corpus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Corpus::Web),
            "personal" => Ok(Corpus::Personal),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_serialization() {
        assert_eq!(serde_json::to_string(&Corpus::Web).unwrap(), "\"web\"");
        assert_eq!(
            serde_json::to_string(&Corpus::Personal).unwrap(),
            "\"personal\""
        );
    }

    #[test]
    fn test_corpus_round_trip() {
        let corpus: Corpus = serde_json::from_str("\"web\"").unwrap();
        assert_eq!(corpus, Corpus::Web);
        assert!(serde_json::from_str::<Corpus>("\"other\"").is_err());
    }

    #[test]
    fn test_personal_document_omits_web_reference() {
        let doc = Document {
            passages: vec![Passage {
                text: "some notes".to_string(),
            }],
            title: "notes".to_string(),
            corpus: Corpus::Personal,
            web_reference: None,
        };

        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("web_reference"));
        assert!(json.contains("\"corpus\":\"personal\""));
    }

    #[test]
    fn test_passages_text_joins_without_separator() {
        let doc = Document {
            passages: vec![
                Passage {
                    text: "first ".to_string(),
                },
                Passage {
                    text: "second".to_string(),
                },
            ],
            title: "t".to_string(),
            corpus: Corpus::Web,
            web_reference: None,
        };

        assert_eq!(doc.passages_text(), "first second");
    }
}
