//! Prompt strategies for the extraction ladder.

use flexscan_core::IdentifierKind;

/// What the model is asked to answer when it cannot read the identifier.
pub const NOT_FOUND_SENTINEL: &str = "NOT FOUND";

/// How the vision model is asked for an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStrategy {
    /// Natural-language request describing what is in the photo.
    Descriptive,
    /// Restates the exact pattern and demands one bare token, with a system
    /// instruction forbidding commentary.
    StrictPattern,
}

impl PromptStrategy {
    pub const ORDER: [PromptStrategy; 2] = [PromptStrategy::Descriptive, PromptStrategy::StrictPattern];

    pub fn label(&self) -> &'static str {
        match self {
            PromptStrategy::Descriptive => "descriptive",
            PromptStrategy::StrictPattern => "strict",
        }
    }

    /// Optional system instruction sent ahead of the user message.
    pub fn system_prompt(&self) -> Option<String> {
        match self {
            PromptStrategy::Descriptive => None,
            PromptStrategy::StrictPattern => Some(format!(
                "You are an OCR engine. Reply with exactly one token and nothing else: \
                 no words, no punctuation, no explanation. If nothing matches, reply {NOT_FOUND_SENTINEL}."
            )),
        }
    }

    pub fn user_prompt(&self, kind: IdentifierKind) -> String {
        match (self, kind) {
            (PromptStrategy::Descriptive, IdentifierKind::Container) => format!(
                "The photo shows a shipping container or its paperwork. Return ONLY the container \
                 number in ISO 6346 format: 4 letters followed by 7 digits (example: MSKU1234565). \
                 If there is none, return: {NOT_FOUND_SENTINEL}."
            ),
            (PromptStrategy::Descriptive, IdentifierKind::Flex) => format!(
                "The photo shows a flexitank label. Return ONLY the serial number in the format \
                 B3G########X-25Q or B3G########X-26Q (example: B3G24071283B-26Q). \
                 If there is none, return: {NOT_FOUND_SENTINEL}."
            ),
            (PromptStrategy::StrictPattern, IdentifierKind::Container) => {
                "Find text matching the pattern [A-Z]{4}[0-9]{7}. Output that single token only."
                    .to_string()
            }
            (PromptStrategy::StrictPattern, IdentifierKind::Flex) => {
                "Find text matching the pattern B3G[0-9]{8,10}[A-Z]-(25Q|26Q). Output that single token only."
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_strict_strategy_sets_system_prompt() {
        assert!(PromptStrategy::Descriptive.system_prompt().is_none());
        assert!(PromptStrategy::StrictPattern.system_prompt().is_some());
    }

    #[test]
    fn prompts_differ_per_kind() {
        for strategy in PromptStrategy::ORDER {
            assert_ne!(
                strategy.user_prompt(IdentifierKind::Container),
                strategy.user_prompt(IdentifierKind::Flex)
            );
        }
    }
}
