//! Instructions sent to the model
//!
//! Every instruction names the target language, tells the model how the
//! content is framed, and forbids anything but the translation in the reply.

use crate::batch::BatchFraming;
use crate::language::SourceLanguage;

fn source_clause(source: &SourceLanguage) -> String {
    match source.name() {
        Some(name) => format!("from {}", name),
        None => "from its detected source language".to_string(),
    }
}

/// Instruction for translating one free-standing text
pub fn text_instruction(source: &SourceLanguage, target: &str) -> String {
    format!(
        "You are a professional translator. Translate the user's text {} into {}.\n\
         Reply with the translation only: no explanations, no notes, no quotation marks.\n\
         Keep line breaks, numbers, and punctuation where they are.",
        source_clause(source),
        target
    )
}

/// Instruction for translating `count` framed segments in one call
pub fn batch_instruction(
    framing: &BatchFraming,
    count: usize,
    source: &SourceLanguage,
    target: &str,
) -> String {
    let format_rules = match framing {
        BatchFraming::Indexed => format!(
            "The user's message is a JSON array of {count} objects of the form \
             {{\"i\": <index>, \"t\": <text>}}.\n\
             Reply with a JSON array of exactly {count} objects of the same form, \
             keeping every \"i\" unchanged and replacing each \"t\" with its translation.\n\
             Do not merge, split, drop, or reorder objects. Reply with the JSON array only."
        ),
        BatchFraming::Delimited { delimiter } => format!(
            "The user's message contains {count} segments separated by the literal \
             delimiter {delimiter}.\n\
             Reply with exactly {count} translated segments separated by the same \
             delimiter {delimiter}, in the same order.\n\
             Do not merge, split, drop, or reorder segments, and do not add the \
             delimiter anywhere else."
        ),
    };

    format!(
        "You are a professional translator. Translate every segment {} into {}.\n{}\n\
         Do not add commentary.",
        source_clause(source),
        target,
        format_rules
    )
}

/// Instruction for reading the text out of an image and translating it
pub fn image_instruction(target: &str) -> String {
    format!(
        "Extract all readable text from the attached image and translate it into {}.\n\
         Reply with the translated text only, keeping the reading order and line breaks. \
         If the image contains no text, reply with an empty message.",
        target
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_instruction_names_languages() {
        let named = text_instruction(&SourceLanguage::Named("English".to_string()), "Arabic");
        assert!(named.contains("from English into Arabic"));

        let auto = text_instruction(&SourceLanguage::Auto, "French");
        assert!(auto.contains("detected source language"));
        assert!(auto.contains("into French"));
    }

    #[test]
    fn test_batch_instruction_states_count_and_framing() {
        let indexed = batch_instruction(&BatchFraming::Indexed, 3, &SourceLanguage::Auto, "fr");
        assert!(indexed.contains("exactly 3 objects"));
        assert!(indexed.contains("\"i\""));

        let delimited = batch_instruction(&BatchFraming::delimited(), 2, &SourceLanguage::Auto, "fr");
        assert!(delimited.contains("exactly 2 translated segments"));
        assert!(delimited.contains("<|||>"));
        assert!(delimited.contains("Do not add commentary"));
    }

    #[test]
    fn test_image_instruction() {
        assert!(image_instruction("German").contains("into German"));
    }
}
