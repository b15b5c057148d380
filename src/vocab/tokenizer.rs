use tokenizers::{
    pre_tokenizers::bert::BertPreTokenizer, OffsetReferential, OffsetType, PreTokenizedString,
    PreTokenizer,
};

use super::Vocabulary;

/// Splits raw text into word tokens and maps them onto vocabulary rows
#[derive(Clone, Debug, Default)]
pub struct Tokenizer {
    /// Lowercase every token before lookup
    pub lowercase: bool,
}

/// The result of encoding a piece of text against a vocabulary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encoding {
    /// Vocabulary row ids, one per token
    pub ids: Vec<usize>,

    /// How many of the tokens were found in the vocabulary
    pub known: usize,
}

impl Tokenizer {
    /// Creates a new tokenizer
    pub fn new(lowercase: bool) -> Self {
        Self { lowercase }
    }

    /// Split text on whitespace and punctuation
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut pretokenized = PreTokenizedString::from(text);

        let tokens: Vec<String> = match BertPreTokenizer.pre_tokenize(&mut pretokenized) {
            Ok(()) => pretokenized
                .get_splits(OffsetReferential::Original, OffsetType::Byte)
                .into_iter()
                .map(|(token, _, _)| token.to_string())
                .collect(),
            Err(e) => {
                log::warn!("Pre-tokenization failed, splitting on whitespace: {}", e);

                text.split_whitespace().map(str::to_string).collect()
            }
        };

        if self.lowercase {
            tokens.into_iter().map(|t| t.to_lowercase()).collect()
        } else {
            tokens
        }
    }

    /// Tokenize text and look up each token, using the OOV row for unknown tokens.
    /// Tokens are matched exactly first, then in lowercase.
    pub fn encode(&self, vocab: &Vocabulary, text: &str) -> Encoding {
        let mut known = 0;

        let ids = self
            .tokenize(text)
            .iter()
            .map(|token| {
                let id = vocab
                    .id(token)
                    .or_else(|| vocab.id(&token.to_lowercase()));

                if id.is_some() {
                    known += 1;
                }

                id.unwrap_or_else(|| vocab.oov_id())
            })
            .collect();

        Encoding { ids, known }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::from_entries(
            2,
            vec![
                ("great".to_string(), vec![1.0, 0.0]),
                ("movie".to_string(), vec![0.0, 1.0]),
                ("!".to_string(), vec![0.5, 0.5]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn splits_words_and_punctuation() {
        let tokenizer = Tokenizer::default();

        assert_eq!(
            tokenizer.tokenize("Great movie, really!"),
            vec!["Great", "movie", ",", "really", "!"]
        );
    }

    #[test]
    fn empty_text_has_no_tokens() {
        let tokenizer = Tokenizer::default();

        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.tokenize("   \n\t").is_empty());
        assert_eq!(
            tokenizer.encode(&vocab(), ""),
            Encoding {
                ids: vec![],
                known: 0
            }
        );
    }

    #[test]
    fn encodes_with_lowercase_fallback_and_oov() {
        let vocab = vocab();
        let tokenizer = Tokenizer::default();

        let encoding = tokenizer.encode(&vocab, "Great movie !? meh");

        assert_eq!(
            encoding.ids,
            vec![
                vocab.id("great").unwrap(),
                vocab.id("movie").unwrap(),
                vocab.id("!").unwrap(),
                vocab.oov_id(),
                vocab.oov_id(),
            ]
        );
        assert_eq!(encoding.known, 3);
    }

    #[test]
    fn lowercases_when_configured() {
        let tokenizer = Tokenizer::new(true);

        assert_eq!(tokenizer.tokenize("LOUD Noises"), vec!["loud", "noises"]);
    }
}
