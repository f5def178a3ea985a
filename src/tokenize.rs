use std::collections::HashSet;
use std::sync::OnceLock;

const MIN_LEN: usize = 2;
const MAX_LEN: usize = 15;

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        [
            "a", "about", "above", "after", "again", "against", "all", "also", "am", "an",
            "and", "any", "are", "as", "at", "be", "because", "been", "before", "being",
            "below", "between", "both", "but", "by", "can", "could", "did", "do", "does",
            "doing", "done", "down", "during", "each", "even", "ever", "every", "few", "for",
            "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
            "herself", "him", "himself", "his", "how", "however", "if", "in", "into", "is",
            "it", "its", "itself", "just", "least", "less", "made", "make", "many", "may",
            "me", "might", "more", "most", "much", "must", "my", "myself", "never", "no",
            "nor", "not", "now", "of", "off", "often", "on", "once", "only", "or", "other",
            "our", "ours", "ourselves", "out", "over", "own", "please", "put", "rather",
            "really", "same", "say", "see", "seem", "she", "should", "since", "so", "some",
            "still", "such", "than", "that", "the", "their", "theirs", "them", "themselves",
            "then", "there", "these", "they", "this", "those", "though", "through", "thus",
            "to", "too", "under", "until", "up", "upon", "us", "very", "was", "we", "well",
            "were", "what", "when", "where", "whether", "which", "while", "who", "whom",
            "whose", "why", "will", "with", "within", "without", "would", "yet", "you",
            "your", "yours", "yourself", "yourselves", "don", "didn", "doesn", "isn", "wasn",
            "ve", "ll", "re",
            // domain words that carry no signal in order reviews
            "order", "food", "get",
        ]
        .into_iter()
        .collect()
    })
}

/// Normalizes a free-text comment into the token sequence the word views count.
pub fn tokenize(comment: &str) -> Vec<String> {
    let stop = stop_words();
    comment
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| {
            let len = word.chars().count();
            (MIN_LEN..=MAX_LEN).contains(&len)
        })
        .map(str::to_lowercase)
        .filter(|word| !stop.contains(word.as_str()))
        .collect()
}
