use proptest::prelude::*;
use finqa_core::chunk_texts;

proptest! {
    #[test]
    fn chunking_preserves_non_whitespace(texts in text_vec(), max_chars in 1usize..200) {
        let chunks = chunk_texts(&texts, max_chars);
        let expected: String = texts.iter().map(|t| non_whitespace(t)).collect();
        let actual: String = chunks.iter().map(|c| non_whitespace(c)).collect();
        prop_assert_eq!(expected, actual);
        prop_assert!(chunks.iter().all(|c| !c.trim().is_empty()));
    }

    #[test]
    fn short_paragraphs_never_overflow(paragraphs in paragraph_vec(), max_chars in 40usize..300) {
        let text = paragraphs.join("\n\n");
        let chunks = chunk_texts(&[text], max_chars);
        for chunk in &chunks {
            prop_assert!(chunk.chars().count() <= max_chars);
        }
        for pair in chunks.windows(2) {
            let joined = format!("{}\n\n{}", pair[0], pair[1]);
            prop_assert!(joined.chars().count() > max_chars);
        }
    }
}

fn non_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

fn text_vec() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z0-9 \n]{0,300}".prop_map(|s| s.to_string()), 0..6)
}

fn paragraph_vec() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z0-9][A-Za-z0-9 .,$]{0,28}[A-Za-z0-9]".prop_map(|s| s.to_string()), 1..30)
}
