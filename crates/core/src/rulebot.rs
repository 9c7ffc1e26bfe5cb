//! Deterministic keyword-substitution responder.
//!
//! A compact rendition of the classic 1960s pattern-matching therapist bot:
//! an ordered script of keyword rules, each with a list of reassembly
//! templates. The reply to an utterance is a pure function of the utterance
//! and the bot's rolling memory — per-rule cursors that rotate through the
//! reassembly lists so the same input does not draw the same canonical
//! transformation twice in a row. A freshly constructed bot is exactly
//! reproducible.

/// One script rule: any keyword hit selects this rule, and the text after
/// the keyword becomes the `$1` capture for its templates.
struct Rule {
    keywords: &'static [&'static str],
    responses: &'static [&'static str],
}

/// Scanned in order; earlier rules take priority.
const SCRIPT: &[Rule] = &[
    Rule {
        keywords: &["sorry", "apologize"],
        responses: &[
            "Please don't apologize.",
            "Apologies are not necessary.",
            "What feelings do you have when you apologize?",
        ],
    },
    Rule {
        keywords: &["remember"],
        responses: &[
            "Do you often think of $1?",
            "What else does $1 bring to mind?",
            "Why do you remember $1 just now?",
        ],
    },
    Rule {
        keywords: &["dream", "dreams", "dreamed"],
        responses: &[
            "What does that dream suggest to you?",
            "Do you dream often?",
            "Are you disturbed by your dreams?",
        ],
    },
    Rule {
        keywords: &[
            "mother", "father", "sister", "brother", "family", "wife", "husband", "children",
        ],
        responses: &[
            "Tell me more about your family.",
            "Who else in your family $1?",
            "What else comes to mind when you think of your family?",
        ],
    },
    Rule {
        keywords: &["i am", "i'm"],
        responses: &[
            "How long have you been $1?",
            "Do you believe it is normal to be $1?",
            "Do you enjoy being $1?",
            "Why do you tell me you are $1?",
        ],
    },
    Rule {
        keywords: &["i feel"],
        responses: &[
            "Tell me more about such feelings.",
            "Do you often feel $1?",
            "What does feeling $1 remind you of?",
        ],
    },
    Rule {
        keywords: &["i want", "i need"],
        responses: &[
            "What would it mean to you if you got $1?",
            "Why do you want $1?",
            "Suppose you got $1 soon. What then?",
        ],
    },
    Rule {
        keywords: &["i can't", "i cannot"],
        responses: &[
            "How do you know you can't $1?",
            "Have you tried?",
            "Perhaps you could $1 now.",
        ],
    },
    Rule {
        keywords: &["i think"],
        responses: &[
            "Do you really think so?",
            "What makes you think $1?",
            "Do you doubt $1?",
        ],
    },
    Rule {
        keywords: &["are you", "you are", "you're"],
        responses: &[
            "Why are you interested in whether I am $1 or not?",
            "Would you prefer if I weren't $1?",
            "What makes you think I am $1?",
        ],
    },
    Rule {
        keywords: &["you"],
        responses: &[
            "We were discussing you, not me.",
            "Why do you say that about me?",
            "What makes you bring me up?",
        ],
    },
    Rule {
        keywords: &["because"],
        responses: &[
            "Is that the real reason?",
            "What other reasons come to mind?",
            "Does that reason apply to anything else?",
        ],
    },
    Rule {
        keywords: &["why"],
        responses: &[
            "Why do you ask?",
            "What answer would please you most?",
            "What do you think?",
        ],
    },
    Rule {
        keywords: &["hello", "hi", "hey"],
        responses: &[
            "Hello. How are you feeling today?",
            "Hi. What would you like to discuss?",
            "Hello. What is on your mind?",
        ],
    },
    Rule {
        keywords: &["computer", "computers", "machine", "robot", "bot", "ai"],
        responses: &[
            "Do computers worry you?",
            "Why do you mention computers?",
            "What do you think machines have to do with your problem?",
        ],
    },
    Rule {
        keywords: &["yes"],
        responses: &["You seem quite positive.", "I see.", "I understand."],
    },
    Rule {
        keywords: &["no"],
        responses: &[
            "Why not?",
            "Are you saying no just to be negative?",
            "Why are you telling me no?",
        ],
    },
    Rule {
        keywords: &["always"],
        responses: &[
            "Can you think of a specific example?",
            "When?",
            "Really, always?",
        ],
    },
    Rule {
        keywords: &["everyone", "everybody", "nobody"],
        responses: &[
            "Surely not everyone.",
            "Can you think of anyone in particular?",
            "Who, for example?",
        ],
    },
    Rule {
        keywords: &["friend", "friends"],
        responses: &[
            "Do your friends worry you?",
            "Tell me about your friends.",
            "Do you depend on your friends?",
        ],
    },
];

/// Used when no rule matches.
const FALLBACKS: &[&str] = &[
    "Please tell me more.",
    "I see. Please go on.",
    "What does that suggest to you?",
    "Can you elaborate on that?",
    "How does that make you feel?",
];

/// The bot always speaks first; openings rotate like everything else.
const OPENINGS: &[&str] = &[
    "Hello. How are you feeling today?",
    "Hi. What would you like to talk about?",
    "Hello. Tell me what has been on your mind.",
];

/// First-person/second-person swaps applied to `$1` captures.
const REFLECTIONS: &[(&str, &str)] = &[
    ("i", "you"),
    ("me", "you"),
    ("my", "your"),
    ("mine", "yours"),
    ("am", "are"),
    ("i'm", "you're"),
    ("i've", "you have"),
    ("i'll", "you will"),
    ("myself", "yourself"),
    ("you", "i"),
    ("your", "my"),
    ("yours", "mine"),
    ("you're", "i'm"),
    ("yourself", "myself"),
    ("we", "you"),
    ("us", "you"),
    ("our", "your"),
];

pub struct RuleBot {
    rule_cursors: Vec<usize>,
    fallback_cursor: usize,
    opening_cursor: usize,
}

impl Default for RuleBot {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBot {
    pub fn new() -> Self {
        Self {
            rule_cursors: vec![0; SCRIPT.len()],
            fallback_cursor: 0,
            opening_cursor: 0,
        }
    }

    /// The scripted greeting used when the bot opens the conversation.
    pub fn opening(&mut self) -> String {
        let text = OPENINGS[self.opening_cursor % OPENINGS.len()];
        self.opening_cursor += 1;
        text.to_string()
    }

    /// Produces the reply to one utterance, rotating the matched rule's
    /// reassembly cursor.
    pub fn transform(&mut self, input: &str) -> String {
        let normalized = normalize(input);
        for (idx, rule) in SCRIPT.iter().enumerate() {
            for keyword in rule.keywords {
                let Some(tail) = match_keyword(&normalized, keyword) else {
                    continue;
                };
                let template = rule.responses[self.rule_cursors[idx] % rule.responses.len()];
                if template.contains("$1") && tail.is_empty() {
                    // Nothing to reassemble; let a later rule or the
                    // fallback handle it.
                    continue;
                }
                self.rule_cursors[idx] += 1;
                return template.replace("$1", &reflect(&tail));
            }
        }
        let text = FALLBACKS[self.fallback_cursor % FALLBACKS.len()];
        self.fallback_cursor += 1;
        text.to_string()
    }
}

/// Lowercases and strips punctuation (apostrophes survive), collapsing
/// whitespace so keywords can be matched on word boundaries.
fn normalize(input: &str) -> String {
    let mapped: String = input
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Finds `keyword` on a word boundary and returns the text following it.
fn match_keyword(normalized: &str, keyword: &str) -> Option<String> {
    let padded = format!(" {normalized} ");
    let needle = format!(" {keyword} ");
    let position = padded.find(&needle)?;
    Some(padded[position + needle.len()..].trim().to_string())
}

fn reflect(capture: &str) -> String {
    capture
        .split_whitespace()
        .map(|word| {
            REFLECTIONS
                .iter()
                .find(|(from, _)| *from == word)
                .map(|(_, to)| *to)
                .unwrap_or(word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_reproducible() {
        let inputs = [
            "hello",
            "i am very sad",
            "my mother takes care of me",
            "xyzzy plugh",
        ];
        let mut a = RuleBot::new();
        let mut b = RuleBot::new();
        for input in inputs {
            assert_eq!(a.transform(input), b.transform(input));
        }
        assert_eq!(RuleBot::new().opening(), RuleBot::new().opening());
    }

    #[test]
    fn repeated_utterance_rotates_the_reassembly() {
        let mut bot = RuleBot::new();
        let first = bot.transform("i am very sad");
        let second = bot.transform("i am very sad");
        assert_ne!(first, second);
    }

    #[test]
    fn captures_are_reflected_into_second_person() {
        let mut bot = RuleBot::new();
        assert_eq!(
            bot.transform("i am very sad"),
            "How long have you been very sad?"
        );

        let mut bot = RuleBot::new();
        bot.transform("my mother is kind");
        assert_eq!(
            bot.transform("my mother takes care of me"),
            "Who else in your family takes care of you?"
        );
    }

    #[test]
    fn keywords_match_whole_words_only() {
        let mut bot = RuleBot::new();
        // "yesterday" must not trigger the "yes" rule.
        assert_eq!(bot.transform("yesterday went badly"), "Please tell me more.");
    }

    #[test]
    fn unmatched_input_rotates_fallbacks() {
        let mut bot = RuleBot::new();
        assert_eq!(bot.transform("qwerty"), "Please tell me more.");
        assert_eq!(bot.transform("qwerty"), "I see. Please go on.");
    }

    #[test]
    fn empty_capture_falls_through_instead_of_garbling() {
        let mut bot = RuleBot::new();
        // "i am" with no tail cannot fill "How long have you been $1?".
        let reply = bot.transform("i am");
        assert!(!reply.contains("$1"));
        assert_eq!(reply, "Please tell me more.");
    }

    #[test]
    fn earlier_rules_win() {
        let mut bot = RuleBot::new();
        // "i am" outranks the bare "you" rule.
        assert_eq!(
            bot.transform("i am worried about you"),
            "How long have you been worried about i?"
        );
    }

    #[test]
    fn openings_rotate() {
        let mut bot = RuleBot::new();
        let first = bot.opening();
        let second = bot.opening();
        assert_ne!(first, second);
    }

    #[test]
    fn punctuation_does_not_block_matching() {
        let mut bot = RuleBot::new();
        assert_eq!(
            bot.transform("Are you a robot?"),
            "Why are you interested in whether I am a robot or not?"
        );
    }
}
